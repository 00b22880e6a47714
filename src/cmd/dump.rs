use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

/// `DUMP key` -- returns an opaque, non-portable textual rendering of the
/// value stored at `key`, or nil if it does not exist.
#[derive(Debug)]
pub struct Dump {
    key: Bytes,
    valid: bool,
}

impl Dump {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Dump> {
        let key = parse.next_bytes()?;

        Ok(Dump { key, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.dump(index, &self.key)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Dump {
    fn new_invalid() -> Dump {
        Dump {
            key: Bytes::new(),
            valid: false,
        }
    }
}
