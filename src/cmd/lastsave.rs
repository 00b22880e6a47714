use crate::{Connection, Db, Frame};

use tracing::debug;

/// `LASTSAVE` -- the unix timestamp, in seconds, of the last successful
/// `SAVE` or `BGSAVE`, or `0` if none has happened yet.
#[derive(Debug)]
pub struct LastSave;

impl LastSave {
    pub(crate) async fn apply(self, db: &Db, dst: &mut Connection) -> crate::Result<()> {
        let secs = db.last_save_ms().map(|ms| ms / 1000).unwrap_or(0);
        let response = Frame::Integer(secs as i64);

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}
