use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Hincrby {
    key: Bytes,
    field: Bytes,
    step: i64,
    valid: bool,
}

impl Hincrby {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn field(&self) -> &Bytes {
        &self.field
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Hincrby> {
        let key = parse.next_bytes()?;
        let field = parse.next_bytes()?;
        let step = parse.next_int()?;
        Ok(Hincrby {
            key,
            field,
            step,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.hincrby(index, &self.key, &self.field, self.step)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Hincrby {
    fn new_invalid() -> Hincrby {
        Hincrby {
            key: Bytes::new(),
            field: Bytes::new(),
            step: 0,
            valid: false,
        }
    }
}
