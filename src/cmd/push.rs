use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Push {
    key: Bytes,
    items: Vec<Bytes>,
    valid: bool,
}

impl Push {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn items(&self) -> &[Bytes] {
        &self.items
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Push> {
        let key = parse.next_bytes()?;
        let mut items = Vec::new();

        while let Ok(item) = parse.next_bytes() {
            items.push(item);
        }

        Ok(Push {
            key,
            items,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection, left: bool) -> crate::Result<()> {
        let response = if self.valid && !self.items.is_empty() {
            db.push(index, &self.key, &self.items, left)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Push {
    fn new_invalid() -> Push {
        Push {
            key: Bytes::new(),
            items: vec![],
            valid: false,
        }
    }
}
