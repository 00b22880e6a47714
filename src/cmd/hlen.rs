use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Hlen {
    key: Bytes,
    valid: bool,
}

impl Hlen {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Hlen> {
        let key = parse.next_bytes()?;
        Ok(Hlen { key, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.hlen(index, &self.key)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Hlen {
    fn new_invalid() -> Hlen {
        Hlen {
            key: Bytes::new(),
            valid: false,
        }
    }
}
