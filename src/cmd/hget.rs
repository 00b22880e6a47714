use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Hget {
    key: Bytes,
    field: Bytes,
    valid: bool,
}

impl Hget {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn field(&self) -> &Bytes {
        &self.field
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Hget> {
        let key = parse.next_bytes()?;
        let field = parse.next_bytes()?;
        Ok(Hget {
            key,
            field,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.hget(index, &self.key, &self.field)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Hget {
    fn new_invalid() -> Hget {
        Hget {
            key: Bytes::new(),
            field: Bytes::new(),
            valid: false,
        }
    }
}
