use crate::cmd::{Invalid, ParseError};
use crate::parse::Parse;
use crate::utils::resp_invalid_arguments;
use crate::{Connection, Db, Frame};

use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

/// Set `key` to hold the string `value`.
///
/// If `key` already holds a value, it is overwritten, regardless of its type.
/// Any previous time to live associated with the key is discarded on a
/// successful `SET`.
///
/// # Options
///
/// * EX `seconds` -- Set the specified expire time, in seconds.
/// * PX `milliseconds` -- Set the specified expire time, in milliseconds.
#[derive(Debug)]
pub struct Set {
    key: Bytes,
    value: Bytes,
    expire: Option<Duration>,
    valid: bool,
}

impl Set {
    pub fn new(key: impl Into<Bytes>, value: Bytes, expire: Option<Duration>) -> Set {
        Set {
            key: key.into(),
            value,
            expire,
            valid: true,
        }
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn expire(&self) -> Option<Duration> {
        self.expire
    }

    /// Expects an array frame containing at least 3 entries.
    ///
    /// ```text
    /// SET key value [EX seconds|PX milliseconds]
    /// ```
    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Set> {
        use ParseError::EndOfStream;

        let key = parse.next_bytes()?;
        let value = parse.next_bytes()?;

        let mut expire = None;

        match parse.next_string() {
            Ok(s) if s.to_uppercase() == "EX" => {
                let secs = parse.next_int()?;
                expire = Some(Duration::from_secs(secs as u64));
            }
            Ok(s) if s.to_uppercase() == "PX" => {
                let ms = parse.next_int()?;
                expire = Some(Duration::from_millis(ms as u64));
            }
            Ok(_) => return Err("currently `SET` only supports the expiration option".into()),
            Err(EndOfStream) => {}
            Err(err) => return Err(err.into()),
        }

        Ok(Set {
            key,
            value,
            expire,
            valid: true,
        })
    }

    pub(crate) async fn apply(self, db: &Db, index: usize, dst: &mut Connection) -> crate::Result<()> {
        let response = if self.valid {
            let expire_ms = self.expire.map(|d| d.as_millis() as u64);
            db.set(index, &self.key, self.value, expire_ms)
        } else {
            resp_invalid_arguments()
        };

        debug!(?response);
        dst.write_frame(&response).await?;

        Ok(())
    }
}

impl Invalid for Set {
    fn new_invalid() -> Set {
        Set {
            key: Bytes::new(),
            value: Bytes::new(),
            expire: None,
            valid: false,
        }
    }
}