use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Hexists {
    key: Bytes,
    field: Bytes,
    valid: bool,
}

impl Hexists {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn field(&self) -> &Bytes {
        &self.field
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Hexists> {
        let key = parse.next_bytes()?;
        let field = parse.next_bytes()?;
        Ok(Hexists {
            key,
            field,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.hexists(index, &self.key, &self.field)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Hexists {
    fn new_invalid() -> Hexists {
        Hexists {
            key: Bytes::new(),
            field: Bytes::new(),
            valid: false,
        }
    }
}
