use crate::cmd::{Invalid, Unknown};
use crate::parse::{Parse, ParseError};
use crate::utils::resp_invalid_arguments;
use crate::{Command, Connection, Db, Frame, Shutdown};

use bytes::Bytes;
use std::pin::Pin;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{StreamExt, StreamMap};
use tracing::debug;

/// `PSUBSCRIBE pattern [pattern ...]`. Same subscribe-loop shape as
/// `SUBSCRIBE`, but matching against the glob pattern table and delivering
/// `pmessage` envelopes that carry both the pattern and the channel a
/// message actually arrived on.
#[derive(Debug)]
pub struct PSubscribe {
    patterns: Vec<String>,
    valid: bool,
}

/// `PUNSUBSCRIBE [pattern ...]`. Issued from within the psubscribe loop.
#[derive(Debug, Clone)]
pub struct PUnsubscribe {
    patterns: Vec<String>,
}

type Messages = Pin<Box<dyn futures::Stream<Item = (String, Bytes)> + Send>>;

impl PSubscribe {
    pub fn new(patterns: Vec<String>) -> PSubscribe {
        PSubscribe {
            patterns,
            valid: true,
        }
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<PSubscribe> {
        use ParseError::EndOfStream;

        let mut patterns = vec![parse.next_string()?];

        loop {
            match parse.next_string() {
                Ok(s) => patterns.push(s),
                Err(EndOfStream) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(PSubscribe::new(patterns))
    }

    pub(crate) async fn apply(
        mut self,
        db: &Db,
        dst: &mut Connection,
        shutdown: &mut Shutdown,
    ) -> crate::Result<()> {
        if !self.valid {
            let response = resp_invalid_arguments();
            debug!(?response);
            dst.write_frame(&response).await?;
            return Ok(());
        }

        let mut subscriptions: StreamMap<String, Messages> = StreamMap::new();

        loop {
            for pattern in self.patterns.drain(..) {
                subscribe_to_pattern(pattern, &mut subscriptions, db, dst).await?;
            }

            tokio::select! {
                Some((pattern, (channel_name, msg))) = subscriptions.next() => {
                    let response = make_pmessage_frame(pattern, channel_name, msg);
                    debug!(?response);
                    dst.write_frame(&response).await?;
                }
                res = dst.read_frame() => {
                    let frame = match res? {
                        Some(frame) => frame,
                        None => return Ok(()),
                    };
                    handle_command(frame, &mut self.patterns, &mut subscriptions, dst).await?;
                }
                _ = shutdown.recv() => {
                    return Ok(());
                }
            };
        }
    }
}

async fn subscribe_to_pattern(
    pattern: String,
    subscriptions: &mut StreamMap<String, Messages>,
    db: &Db,
    dst: &mut Connection,
) -> crate::Result<()> {
    let rx = db.psubscribe(&pattern);
    let rx = BroadcastStream::new(rx).filter_map(|res| res.ok());
    subscriptions.insert(pattern.clone(), Box::pin(rx));

    let response = make_psubscribe_frame(pattern, subscriptions.len());
    debug!(?response);
    dst.write_frame(&response).await?;

    Ok(())
}

async fn handle_command(
    frame: Frame,
    subscribe_to: &mut Vec<String>,
    subscriptions: &mut StreamMap<String, Messages>,
    dst: &mut Connection,
) -> crate::Result<()> {
    match Command::from_frame(frame)? {
        Command::PSubscribe(psubscribe) => {
            subscribe_to.extend(psubscribe.patterns.into_iter());
        }
        Command::PUnsubscribe(mut punsubscribe) => {
            if punsubscribe.patterns.is_empty() {
                punsubscribe.patterns = subscriptions.keys().map(|k| k.to_string()).collect();
            }

            for pattern in punsubscribe.patterns {
                subscriptions.remove(&pattern);
                let response = make_punsubscribe_frame(pattern, subscriptions.len());
                debug!(?response);
                dst.write_frame(&response).await?;
            }
        }
        cmd => {
            let cmd = Unknown::new(cmd.get_name());
            cmd.apply(dst).await?;
        }
    };
    Ok(())
}

fn make_psubscribe_frame(pattern: String, num_subs: usize) -> Frame {
    let mut response = Frame::array();
    response.push_bulk(Bytes::from_static(b"psubscribe"));
    response.push_bulk(Bytes::from(pattern));
    response.push_int(num_subs as i64);
    response
}

fn make_punsubscribe_frame(pattern: String, num_subs: usize) -> Frame {
    let mut response = Frame::array();
    response.push_bulk(Bytes::from_static(b"punsubscribe"));
    response.push_bulk(Bytes::from(pattern));
    response.push_int(num_subs as i64);
    response
}

fn make_pmessage_frame(pattern: String, channel_name: String, msg: Bytes) -> Frame {
    let mut response = Frame::array();
    response.push_bulk(Bytes::from_static(b"pmessage"));
    response.push_bulk(Bytes::from(pattern));
    response.push_bulk(Bytes::from(channel_name));
    response.push_bulk(msg);
    response
}

impl PUnsubscribe {
    pub fn new(patterns: &[String]) -> PUnsubscribe {
        PUnsubscribe {
            patterns: patterns.to_vec(),
        }
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<PUnsubscribe> {
        use ParseError::EndOfStream;

        let mut patterns = vec![];

        loop {
            match parse.next_string() {
                Ok(s) => patterns.push(s),
                Err(EndOfStream) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(PUnsubscribe { patterns })
    }
}

impl Invalid for PSubscribe {
    fn new_invalid() -> PSubscribe {
        PSubscribe {
            patterns: vec![],
            valid: false,
        }
    }
}

impl Invalid for PUnsubscribe {
    fn new_invalid() -> PUnsubscribe {
        PUnsubscribe { patterns: vec![] }
    }
}
