use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

/// Shared implementation for `RENAME` and `RENAMENX`.
#[derive(Debug)]
pub struct Rename {
    src: Bytes,
    dst: Bytes,
    valid: bool,
}

impl Rename {
    pub fn src(&self) -> &Bytes {
        &self.src
    }

    pub fn dst(&self) -> &Bytes {
        &self.dst
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Rename> {
        let src = parse.next_bytes()?;
        let dst = parse.next_bytes()?;

        Ok(Rename { src, dst, valid: true })
    }

    pub(crate) async fn apply(
        self,
        db: &Db,
        index: usize,
        dst: &mut Connection,
        not_exists: bool,
    ) -> crate::Result<()> {
        let response = if self.valid {
            if not_exists {
                db.renamenx(index, &self.src, &self.dst)
            } else {
                db.rename(index, &self.src, &self.dst)
            }
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Rename {
    fn new_invalid() -> Rename {
        Rename {
            src: Bytes::new(),
            dst: Bytes::new(),
            valid: false,
        }
    }
}
