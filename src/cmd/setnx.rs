use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

/// `SETNX key value` -- sets `key` to `value` only if `key` does not
/// already exist.
#[derive(Debug)]
pub struct SetNx {
    key: Bytes,
    value: Bytes,
    valid: bool,
}

impl SetNx {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<SetNx> {
        let key = parse.next_bytes()?;
        let value = parse.next_bytes()?;

        Ok(SetNx { key, value, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.setnx(index, &self.key, self.value)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for SetNx {
    fn new_invalid() -> SetNx {
        SetNx {
            key: Bytes::new(),
            value: Bytes::new(),
            valid: false,
        }
    }
}
