use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

#[derive(Debug)]
pub struct Lrange {
    key: Bytes,
    start: i64,
    stop: i64,
    valid: bool,
}

impl Lrange {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Lrange> {
        let key = parse.next_bytes()?;
        let start = parse.next_int()?;
        let stop = parse.next_int()?;

        Ok(Lrange {
            key,
            start,
            stop,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.lrange(index, &self.key, self.start, self.stop)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Lrange {
    fn new_invalid() -> Lrange {
        Lrange {
            key: Bytes::new(),
            start: 0,
            stop: 0,
            valid: false,
        }
    }
}
