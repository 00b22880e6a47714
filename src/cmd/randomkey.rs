use crate::{Connection, Db};

use tracing::debug;

/// Returns a key picked uniformly at random from the selected database, or
/// nil if it is empty. Takes no arguments.
#[derive(Debug)]
pub struct RandomKey;

impl RandomKey {
    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = db.randomkey(index);

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}
