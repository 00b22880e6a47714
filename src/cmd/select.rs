use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::{resp_invalid_arguments, resp_ok};
use crate::Connection;

use tracing::debug;

/// `SELECT db` -- repoints the connection's database index. Databases are
/// created lazily, so any non-negative index is accepted.
#[derive(Debug)]
pub struct Select {
    index: i64,
    valid: bool,
}

impl Select {
    pub fn index(&self) -> i64 {
        self.index
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Select> {
        let index = parse.next_int()?;

        Ok(Select { index, valid: true })
    }

    /// Updates `*db_index` in place and replies `OK`, or an error if the
    /// index is negative.
    pub(crate) async fn apply(self, db_index: &mut usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if !self.valid {
            resp_invalid_arguments()
        } else if self.index < 0 {
            crate::Frame::Error("ERR DB index is out of range".to_string())
        } else {
            *db_index = self.index as usize;
            resp_ok()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Select {
    fn new_invalid() -> Select {
        Select {
            index: 0,
            valid: false,
        }
    }
}
