use crate::utils::resp_str;
use crate::{Connection, Db, SNAPSHOT_NAME};

use std::path::Path;
use tracing::{debug, error, info};

/// `BGSAVE` -- takes a consistent snapshot of every database under the
/// usual lock, then hands the actual disk write off to a blocking task and
/// replies immediately. There is no `fork()` equivalent for a multi-threaded
/// async process, so a blocking task is the closest analogue: the snapshot
/// itself is already a point-in-time copy by the time the task is spawned.
#[derive(Debug)]
pub struct BgSave;

impl BgSave {
    pub(crate) async fn apply(self, db: &Db, data_dir: &Path, dst: &mut Connection) -> crate::Result<()> {
        let (databases, saved_at_ms) = db.snapshot();
        let data_dir = data_dir.to_path_buf();

        tokio::task::spawn_blocking(move || {
            match crate::snapshot::save(&data_dir, SNAPSHOT_NAME, &databases, saved_at_ms) {
                Ok(()) => info!("background save completed"),
                Err(err) => error!(%err, "background save failed"),
            }
        });

        let response = resp_str("Background saving started");
        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}
