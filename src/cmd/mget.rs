use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db, Frame};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Mget {
    keys: Vec<Bytes>,
    valid: bool,
}

impl Mget {
    pub fn keys(&self) -> &[Bytes] {
        &self.keys
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Mget> {
        let mut keys = Vec::new();
        while let Ok(key) = parse.next_bytes() {
            keys.push(key);
        }
        Ok(Mget { keys, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.mget(index, &self.keys)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Mget {
    fn new_invalid() -> Mget {
        Mget {
            keys: vec![],
            valid: false,
        }
    }
}