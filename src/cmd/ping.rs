use crate::cmd::Invalid;
use crate::parse::{Parse, ParseError};
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Frame};

use bytes::Bytes;
use tracing::debug;

/// `PING [message]` -- without a message, replies `PONG`; with one, echoes
/// it back as a bulk string.
#[derive(Debug)]
pub struct Ping {
    msg: Option<Bytes>,
    valid: bool,
}

impl Ping {
    pub fn new(msg: Option<Bytes>) -> Ping {
        Ping { msg, valid: true }
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Ping> {
        match parse.next_bytes() {
            Ok(msg) => Ok(Ping::new(Some(msg))),
            Err(ParseError::EndOfStream) => Ok(Ping::new(None)),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) async fn apply(self, dst: &mut Connection) -> crate::Result<()> {
        let response = if !self.valid {
            resp_invalid_arguments()
        } else {
            match self.msg {
                None => Frame::Simple("PONG".to_string()),
                Some(msg) => Frame::Bulk(msg),
            }
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Ping {
    fn new_invalid() -> Ping {
        Ping {
            msg: None,
            valid: false,
        }
    }
}
