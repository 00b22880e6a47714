use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Hdel {
    key: Bytes,
    fields: Vec<Bytes>,
    valid: bool,
}

impl Hdel {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Hdel> {
        let key = parse.next_bytes()?;
        let mut fields = Vec::new();
        while let Ok(field) = parse.next_bytes() {
            fields.push(field);
        }
        Ok(Hdel {
            key,
            fields,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid && !self.fields.is_empty() {
            db.hdel(index, &self.key, &self.fields)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Hdel {
    fn new_invalid() -> Hdel {
        Hdel {
            key: Bytes::new(),
            fields: vec![],
            valid: false,
        }
    }
}
