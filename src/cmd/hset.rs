use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Hset {
    key: Bytes,
    fields: Vec<(Bytes, Bytes)>,
    valid: bool,
}

impl Hset {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn fields(&self) -> &[(Bytes, Bytes)] {
        &self.fields
    }

    pub(crate) fn valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Hset> {
        let key = parse.next_bytes()?;
        let mut fields = Vec::new();

        while let Ok(field) = parse.next_bytes() {
            let value = parse.next_bytes().map_err(|_| "protocol error")?;
            fields.push((field, value));
        }

        Ok(Hset {
            key,
            fields,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection, nx: bool) -> crate::Result<()> {
        let response = if !self.valid || self.fields.is_empty() || (nx && self.fields.len() != 1) {
            resp_invalid_arguments()
        } else {
            db.hset(index, &self.key, &self.fields, nx)
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Hset {
    fn new_invalid() -> Hset {
        Hset {
            key: Bytes::new(),
            fields: vec![],
            valid: false,
        }
    }
}
