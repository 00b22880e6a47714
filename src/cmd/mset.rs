use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db, Frame};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Mset {
    pairs: Vec<(Bytes, Bytes)>,
    valid: bool,
}

impl Mset {
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Mset> {
        let mut pairs = Vec::new();
        while let Ok(key) = parse.next_bytes() {
            let value = parse.next_bytes().map_err(|_| "protocol error")?;
            pairs.push((key, value));
        }
        Ok(Mset { pairs, valid: true })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid && !self.pairs.is_empty() {
            db.mset(index, &self.pairs)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Mset {
    fn new_invalid() -> Mset {
        Mset {
            pairs: vec![],
            valid: false,
        }
    }
}
