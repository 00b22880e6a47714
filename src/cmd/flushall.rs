use crate::{Connection, Db};

use tracing::debug;

/// `FLUSHALL` -- clears every key in every database. Takes no arguments.
#[derive(Debug)]
pub struct FlushAll;

impl FlushAll {
    pub(crate) async fn apply(self, db: &Db, dst: &mut Connection) -> crate::Result<()> {
        let response = db.flushall();

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}
