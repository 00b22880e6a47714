use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db};

use bytes::Bytes;
use tracing::debug;

/// `MOVE key db` -- moves `key` from the currently selected database to
/// database `db`, failing if the key does not exist in the source or
/// already exists in the destination.
#[derive(Debug)]
pub struct Move {
    key: Bytes,
    dest_index: usize,
    valid: bool,
}

impl Move {
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn dest_index(&self) -> usize {
        self.dest_index
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Move> {
        let key = parse.next_bytes()?;
        let dest_index = parse.next_int()? as usize;

        Ok(Move {
            key,
            dest_index,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            db.move_key(index, &self.key, self.dest_index)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Move {
    fn new_invalid() -> Move {
        Move {
            key: Bytes::new(),
            dest_index: 0,
            valid: false,
        }
    }
}
