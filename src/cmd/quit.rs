use crate::utils::resp_ok;
use crate::Connection;

use tracing::debug;

/// `QUIT` -- replies `OK` and closes the connection. Takes no arguments.
#[derive(Debug)]
pub struct Quit;

impl Quit {
    pub(crate) async fn apply(self, dst: &mut Connection) -> crate::Result<()> {
        let response = resp_ok();

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}
