use crate::{Connection, Db};

use tracing::debug;

/// `FLUSHDB` -- clears every key in the currently selected database. Takes
/// no arguments.
#[derive(Debug)]
pub struct FlushDb;

impl FlushDb {
    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = db.flushdb(index);

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}
