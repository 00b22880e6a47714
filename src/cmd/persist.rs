use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

/// Removes any deadline from `key`, turning a volatile key into a
/// persistent one. A no-op (and replies `0`) if the key has no deadline
/// or does not exist.
#[derive(Debug)]
pub struct Persist {
    key: Bytes,
    valid: bool,
}

impl Persist {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Persist> {
        let key = parse.next_bytes()?;

        Ok(Persist { key, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.persist(index, &self.key)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Persist {
    fn new_invalid() -> Persist {
        Persist {
            key: Bytes::new(),
            valid: false,
        }
    }
}
