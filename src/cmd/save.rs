use crate::utils::{resp_err, resp_ok};
use crate::{Connection, Db, SNAPSHOT_NAME};

use std::path::Path;
use tracing::debug;

/// `SAVE` -- writes a snapshot of every database to disk synchronously,
/// replying only once the write has completed.
#[derive(Debug)]
pub struct Save;

impl Save {
    pub(crate) async fn apply(self, db: &Db, data_dir: &Path, dst: &mut Connection) -> crate::Result<()> {
        let (databases, saved_at_ms) = db.snapshot();
        let response = match crate::snapshot::save(data_dir, SNAPSHOT_NAME, &databases, saved_at_ms) {
            Ok(()) => resp_ok(),
            Err(err) => resp_err(&format!("ERR {err}")),
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}
