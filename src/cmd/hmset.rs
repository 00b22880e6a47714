use crate::cmd::{Hset, Invalid};
use crate::parse::Parse;
use crate::utils::{resp_invalid_arguments, resp_ok};
use crate::{Connection, Db};

use tracing::debug;

/// `HMSET k (f v)+` -- like `HSET`, but always replies `OK` rather than the
/// count of newly-added fields.
#[derive(Debug)]
pub struct Hmset {
    inner: Hset,
}

impl Hmset {
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Hmset> {
        Ok(Hmset {
            inner: Hset::parse_frames(parse)?,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if !self.inner.valid() || self.inner.fields().is_empty() {
            resp_invalid_arguments()
        } else {
            db.hset(index, self.inner.key(), self.inner.fields(), false);
            resp_ok()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Hmset {
    fn new_invalid() -> Hmset {
        Hmset {
            inner: Hset::new_invalid(),
        }
    }
}
