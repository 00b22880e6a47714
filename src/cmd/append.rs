use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

/// `APPEND key value` -- appends `value` to the string at `key`, creating
/// it if it does not exist. Replies with the length of the string after
/// the append.
#[derive(Debug)]
pub struct Append {
    key: Bytes,
    value: Bytes,
    valid: bool,
}

impl Append {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Append> {
        let key = parse.next_bytes()?;
        let value = parse.next_bytes()?;

        Ok(Append { key, value, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.append(index, &self.key, &self.value)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Append {
    fn new_invalid() -> Append {
        Append {
            key: Bytes::new(),
            value: Bytes::new(),
            valid: false,
        }
    }
}
