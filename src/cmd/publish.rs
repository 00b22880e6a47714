use crate::cmd::Invalid;
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db, Frame};

use bytes::Bytes;
use tracing::debug;

/// `PUBLISH channel message` -- delivers `message` to every connection
/// subscribed to `channel`, exactly or via a matching pattern. Replies with
/// the number of connections that received it.
#[derive(Debug)]
pub struct Publish {
    channel: String,
    message: Bytes,
    valid: bool,
}

impl Publish {
    pub fn new(channel: impl ToString, message: Bytes) -> Publish {
        Publish {
            channel: channel.to_string(),
            message,
            valid: true,
        }
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Publish> {
        let channel = parse.next_string()?;
        let message = parse.next_bytes()?;

        Ok(Publish::new(channel, message))
    }

    pub(crate) async fn apply(self, db: &Db, dst: &mut Connection) -> crate::Result<()> {
        let response = if !self.valid {
            resp_invalid_arguments()
        } else {
            let num_subscribers = db.publish(&self.channel, self.message);
            Frame::Integer(num_subscribers as i64)
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Publish {
    fn new_invalid() -> Publish {
        Publish {
            channel: String::new(),
            message: Bytes::new(),
            valid: false,
        }
    }
}
