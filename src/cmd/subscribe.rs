use crate::cmd::{Invalid, Unknown};
use crate::parse::{Parse, ParseError};
use crate::utils::resp_invalid_arguments;
use crate::{Command, Connection, Db, Frame, Shutdown};

use bytes::Bytes;
use std::pin::Pin;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{StreamExt, StreamMap};
use tracing::debug;

/// `SUBSCRIBE channel [channel ...]`
///
/// Once a connection issues `SUBSCRIBE`, it enters pub/sub mode: it may only
/// issue further `SUBSCRIBE`, `UNSUBSCRIBE`, `PSUBSCRIBE`, `PUNSUBSCRIBE`,
/// and `PING` commands, and messages published to a subscribed channel are
/// pushed to it as they arrive.
#[derive(Debug)]
pub struct Subscribe {
    channels: Vec<String>,
    valid: bool,
}

/// `UNSUBSCRIBE [channel ...]`. Issued from within the subscribe loop, never
/// dispatched on its own.
#[derive(Debug, Clone)]
pub struct Unsubscribe {
    channels: Vec<String>,
}

type Messages = Pin<Box<dyn futures::Stream<Item = Bytes> + Send>>;

impl Subscribe {
    pub fn new(channels: Vec<String>) -> Subscribe {
        Subscribe {
            channels,
            valid: true,
        }
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Subscribe> {
        use ParseError::EndOfStream;

        let mut channels = vec![parse.next_string()?];

        loop {
            match parse.next_string() {
                Ok(s) => channels.push(s),
                Err(EndOfStream) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(Subscribe::new(channels))
    }

    /// Runs the subscription loop for the lifetime of the connection, or
    /// until the client unsubscribes from every channel. A malformed
    /// `SUBSCRIBE` (no channels given) replies with the arity error instead
    /// of entering the loop.
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
            for channel_name in self.channels.drain(..) {
                subscribe_to_channel(channel_name, &mut subscriptions, db, dst).await?;
            }

            tokio::select! {
                Some((channel_name, msg)) = subscriptions.next() => {
                    let response = make_message_frame(channel_name, msg);
                    debug!(?response);
                    dst.write_frame(&response).await?;
                }
                res = dst.read_frame() => {
                    let frame = match res? {
                        Some(frame) => frame,
                        None => return Ok(()),
                    };
                    handle_command(frame, &mut self.channels, &mut subscriptions, dst).await?;
                }
                _ = shutdown.recv() => {
                    return Ok(());
                }
            };
        }
    }
}

async fn subscribe_to_channel(
    channel_name: String,
    subscriptions: &mut StreamMap<String, Messages>,
    db: &Db,
    dst: &mut Connection,
) -> crate::Result<()> {
    let rx = db.subscribe(&channel_name);
    let rx = BroadcastStream::new(rx).filter_map(|res| res.ok());
    subscriptions.insert(channel_name.clone(), Box::pin(rx));

    let response = make_subscribe_frame(channel_name, subscriptions.len());
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
        Command::Subscribe(subscribe) => {
            subscribe_to.extend(subscribe.channels.into_iter());
        }
        Command::Unsubscribe(mut unsubscribe) => {
            if unsubscribe.channels.is_empty() {
                unsubscribe.channels = subscriptions.keys().map(|k| k.to_string()).collect();
            }

            for channel_name in unsubscribe.channels {
                subscriptions.remove(&channel_name);
                let response = make_unsubscribe_frame(channel_name, subscriptions.len());
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

fn make_subscribe_frame(channel_name: String, num_subs: usize) -> Frame {
    let mut response = Frame::array();
    response.push_bulk(Bytes::from_static(b"subscribe"));
    response.push_bulk(Bytes::from(channel_name));
    response.push_int(num_subs as i64);
    response
}

fn make_unsubscribe_frame(channel_name: String, num_subs: usize) -> Frame {
    let mut response = Frame::array();
    response.push_bulk(Bytes::from_static(b"unsubscribe"));
    response.push_bulk(Bytes::from(channel_name));
    response.push_int(num_subs as i64);
    response
}

fn make_message_frame(channel_name: String, msg: Bytes) -> Frame {
    let mut response = Frame::array();
    response.push_bulk(Bytes::from_static(b"message"));
    response.push_bulk(Bytes::from(channel_name));
    response.push_bulk(msg);
    response
}

impl Unsubscribe {
    pub fn new(channels: &[String]) -> Unsubscribe {
        Unsubscribe {
            channels: channels.to_vec(),
        }
    }

    pub(crate) fn parse_frames(parse: &mut Parse) -> crate::Result<Unsubscribe> {
        use ParseError::EndOfStream;

        let mut channels = vec![];

        loop {
            match parse.next_string() {
                Ok(s) => channels.push(s),
                Err(EndOfStream) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(Unsubscribe { channels })
    }
}

impl Invalid for Subscribe {
    fn new_invalid() -> Subscribe {
        Subscribe {
            channels: vec![],
            valid: false,
        }
    }
}

impl Invalid for Unsubscribe {
    fn new_invalid() -> Unsubscribe {
        Unsubscribe { channels: vec![] }
    }
}
