use crate::cmd::Invalid;
use crate::db::now_ms;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use tracing::debug;

/// Shared implementation for `EXPIRE`, `EXPIREAT`, `PEXPIRE`, and `PEXPIREAT`.
#[derive(Debug)]
pub struct Expire {
    key: bytes::Bytes,
    amount: i64,
    valid: bool,
}

impl Expire {
    pub fn key(&self) -> &bytes::Bytes {
        &self.key
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Expire> {
        let key = parse.next_bytes()?;
        let amount = parse.next_int()?;

        Ok(Expire {
            key,
            amount,
            valid: true,
        })
    }

    /// `is_millis` tells whether `amount` is already in milliseconds;
    /// `at` tells whether `amount` is an absolute timestamp rather than a
    /// relative offset from now.
    pub(crate) async fn apply(
        self,
        db: &Db,
        index: usize,
        dst: &mut Connection,
        is_millis: bool,
        at: bool,
    ) -> crate::Result<()> {
        let response = if !self.valid {
            resp_invalid_arguments()
        } else {
            let mut ms = if is_millis { self.amount } else { self.amount * 1000 };
            if !at {
                ms += now_ms() as i64;
            }
            let deadline_ms = if ms < 0 { 0 } else { ms as u64 };
            db.set_expiration(index, &self.key, deadline_ms)
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Expire {
    fn new_invalid() -> Expire {
        Expire {
            key: bytes::Bytes::new(),
            amount: 0,
            valid: false,
        }
    }
}
