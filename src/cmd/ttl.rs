use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct TTL {
    key: Bytes,
    valid: bool,
}

impl TTL {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<TTL> {
        let key = parse.next_bytes()?;

        Ok(TTL { key, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection, is_millis: bool) -> crate::Result<()> {
        let response = if self.valid {
            db.ttl(index, &self.key, is_millis)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for TTL {
    fn new_invalid() -> TTL {
        TTL {
            key: Bytes::new(),
            valid: false,
        }
    }
}