use crate::cmd::Invalid;
use crate::parse::{Parse, ParseError};

/// `SHUTDOWN [NOSAVE]` -- requests an orderly server shutdown. Unless
/// `NOSAVE` is given, a final snapshot is written before the process exits.
///
/// There is no reply: a well-behaved client expects the connection to close
/// instead, which is what a normal `SHUTDOWN` does. A malformed invocation
/// is the one exception -- that replies with the usual arity error rather
/// than bringing the server down.
#[derive(Debug)]
pub struct ShutdownCmd {
    save: bool,
    valid: bool,
}

impl ShutdownCmd {
    pub fn save(&self) -> bool {
        self.save
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<ShutdownCmd> {
        match parse.next_string() {
            Ok(s) if s.eq_ignore_ascii_case("NOSAVE") => Ok(ShutdownCmd {
                save: false,
                valid: true,
            }),
            Ok(_) => Err("ERR syntax error".into()),
            Err(ParseError::EndOfStream) => Ok(ShutdownCmd {
                save: true,
                valid: true,
            }),
            Err(err) => Err(err.into()),
        }
    }
}

impl Invalid for ShutdownCmd {
    fn new_invalid() -> ShutdownCmd {
        ShutdownCmd {
            save: true,
            valid: false,
        }
    }
}
