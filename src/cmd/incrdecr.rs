use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db, Frame};

use bytes::Bytes;
use tracing::debug;

/// Shared implementation for `INCR`, `DECR`, `INCRBY`, and `DECRBY`.
#[derive(Debug)]
pub struct IncrDecr {
    key: Bytes,
    step: i64,
    valid: bool,
}

impl IncrDecr {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub(crate) fn parse_frames(parse: &mut Parse, single_step: bool) -> crate::Result<IncrDecr> {
        let key = parse.next_bytes()?;
        let step = if single_step { 1 } else { parse.next_int()? };
        Ok(IncrDecr {
            key,
            step,
            valid: true,
        })
    }

    /// `inc` is `false` for `DECR`/`DECRBY`, which negates the step before
    /// handing it to the shared `Db` implementation.
    pub(crate) async fn apply(
        mut self,
        db: &Db,
        index: usize,
        dst: &mut Connection,
        inc: bool,
    ) -> crate::Result<()> {
        let response = if !self.valid {
            resp_invalid_arguments()
        } else {
            if !inc {
                if self.step == i64::MIN {
                    dst.write_frame(&Frame::Error("ERR decrement would overflow".to_string()))
                        .await?;
                    return Ok(());
                }
                self.step = -self.step;
            }
            db.incr_by(index, &self.key, self.step)
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for IncrDecr {
    fn new_invalid() -> IncrDecr {
        IncrDecr {
            key: Bytes::new(),
            step: 0,
            valid: false,
        }
    }
}