use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Exists {
    keys: Vec<Bytes>,
    valid: bool,
}

impl Exists {
    pub fn keys(&self) -> &[Bytes] {
        &self.keys
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Exists> {
        let mut keys = Vec::new();
        while let Ok(key) = parse.next_bytes() {
            keys.push(key);
        }
        Ok(Exists { keys, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid && !self.keys.is_empty() {
            db.exists(index, &self.keys)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Exists {
    fn new_invalid() -> Exists {
        Exists {
            keys: vec![],
            valid: false,
        }
    }
}
