use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Pop {
    key: Bytes,
    count: i64,
    valid: bool,
}

impl Pop {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Pop> {
        let key = parse.next_bytes()?;
        let count = parse.next_int().unwrap_or(1);

        Ok(Pop {
            key,
            count,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection, left: bool) -> crate::Result<()> {
        let response = if self.valid {
            db.pop(index, &self.key, left, self.count)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Pop {
    fn new_invalid() -> Pop {
        Pop {
            key: Bytes::new(),
            count: 0,
            valid: false,
        }
    }
}
