use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

/// `GETSET key value` -- atomically sets `key` to `value` and returns the
/// previous value, or nil if the key did not exist.
#[derive(Debug)]
pub struct GetSet {
    key: Bytes,
    value: Bytes,
    valid: bool,
}

impl GetSet {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<GetSet> {
        let key = parse.next_bytes()?;
        let value = parse.next_bytes()?;

        Ok(GetSet { key, value, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.getset(index, &self.key, self.value)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for GetSet {
    fn new_invalid() -> GetSet {
        GetSet {
            key: Bytes::new(),
            value: Bytes::new(),
            valid: false,
        }
    }
}
