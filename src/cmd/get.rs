use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db, Frame};

use bytes::Bytes;
use tracing::debug;

/// Get the value of key.
///
/// If the key does not exist the special value nil is returned. An error is
/// returned if the value stored at key is not a string, because GET only
/// handles string values.
#[derive(Debug)]
pub struct Get {
    key: Bytes,
    valid: bool,
}

impl Get {
    pub fn new(key: impl Into<Bytes>) -> Get {
        Get {
            key: key.into(),
            valid: true,
        }
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    /// Expects an array frame containing two entries.
    ///
    /// ```text
    /// GET key
    /// ```
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Get> {
        let key = parse.next_bytes()?;
        Ok(Get { key, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.get(index, &self.key)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Get {
    fn new_invalid() -> Get {
        Get {
            key: Bytes::new(),
            valid: false,
        }
    }
}
