use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db, Frame};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Strlen {
    key: Bytes,
    valid: bool,
}

impl Strlen {
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Strlen> {
        let key = parse.next_bytes()?;
        Ok(Strlen { key, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.strlen(index, &self.key)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Strlen {
    fn new_invalid() -> Strlen {
        Strlen {
            key: Bytes::new(),
            valid: false,
        }
    }
}