use crate::frame::Frame;
use crate::glob;
use crate::DbError;

use bytes::Bytes;
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tracing::debug;

/// Maximum fraction of a database's volatile keys sampled per active expire
/// pass (up to 25%).
const ACTIVE_EXPIRE_SAMPLE_FRACTION: f64 = 0.25;

/// Hard cap on the number of keys examined per active expire pass, so a
/// database with many volatile keys cannot blow out per-request latency.
const ACTIVE_EXPIRE_SAMPLE_MAX: usize = 20;

/// The value stored for a key. A tagged union over the shapes this server
/// understands; every command handler matches on this tag before touching
/// the payload, and any mismatch is a [`DbError::WrongType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    String(Bytes),
    List(VecDeque<Bytes>),
    Hash(HashMap<Bytes, Bytes>),
}

impl Value {
    /// The name `TYPE` reports for this value.
    fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Hash(_) => "hash",
        }
    }
}

/// A single logical keyspace: the key/value map plus the expiration
/// deadlines (milliseconds since the epoch) for its volatile keys.
///
/// This type is plain data with no interior synchronization, which is what
/// lets the snapshot store serialize it directly (see [`crate::snapshot`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    entries: HashMap<Bytes, Value>,
    expirations: HashMap<Bytes, u64>,
}

impl Database {
    /// Removes `key` if it has a deadline that has passed. Returns `true` if
    /// the key was removed.
    fn expire_if_due(&mut self, key: &[u8], now_ms: u64) -> bool {
        let due = matches!(self.expirations.get(key), Some(deadline) if *deadline <= now_ms);
        if due {
            self.entries.remove(key);
            self.expirations.remove(key);
        }
        due
    }

    /// Active sampled sweep: examine a bounded, uniformly sampled subset of
    /// the volatile keys and expire any that are due.
    fn sample_sweep(&mut self, now_ms: u64) {
        let sample_size = ((self.expirations.len() as f64 * ACTIVE_EXPIRE_SAMPLE_FRACTION).ceil()
            as usize)
            .min(ACTIVE_EXPIRE_SAMPLE_MAX);
        if sample_size == 0 {
            return;
        }

        let mut rng = rand::thread_rng();
        let sampled: Vec<Bytes> = self
            .expirations
            .keys()
            .cloned()
            .choose_multiple(&mut rng, sample_size);

        for key in sampled {
            if self.expire_if_due(&key, now_ms) {
                debug!(key = ?key, "active expire swept key");
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.expirations.clear();
    }
}

/// Channel and pattern subscription routing. Each channel/pattern gets its
/// own broadcast channel lazily; a connection subscribes by keeping the
/// `Receiver` side and polling it alongside new commands.
#[derive(Debug, Default)]
struct PubSub {
    channels: Mutex<HashMap<String, broadcast::Sender<Bytes>>>,
    patterns: Mutex<HashMap<String, broadcast::Sender<(String, Bytes)>>>,
}

const PUBSUB_CHANNEL_CAPACITY: usize = 256;

impl PubSub {
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Bytes> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(PUBSUB_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    fn psubscribe(&self, pattern: &str) -> broadcast::Receiver<(String, Bytes)> {
        let mut patterns = self.patterns.lock().unwrap();
        patterns
            .entry(pattern.to_string())
            .or_insert_with(|| broadcast::channel(PUBSUB_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Delivers `msg` to exact-channel subscribers and to every matching
    /// pattern subscriber. Returns the total recipient count.
    fn publish(&self, channel: &str, msg: Bytes) -> usize {
        let mut recipients = 0;

        if let Some(tx) = self.channels.lock().unwrap().get(channel) {
            recipients += tx.send(msg.clone()).unwrap_or(0);
        }

        for (pattern, tx) in self.patterns.lock().unwrap().iter() {
            if glob::matches(pattern.as_bytes(), channel.as_bytes()) {
                recipients += tx.send((channel.to_string(), msg.clone())).unwrap_or(0);
            }
        }

        recipients
    }
}

/// Shared, lockable server state: the numbered databases plus pub/sub
/// routing. A single coarse `Mutex` over the database vector is the
/// concurrency discipline this server uses: every command acquires it once,
/// so no interleaving of reads/writes from other connections is ever
/// observable mid-command.
#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    pubsub: PubSub,
}

#[derive(Debug)]
struct State {
    dbs: Vec<Database>,
    last_save_ms: Option<u64>,
}

impl State {
    fn ensure_db(&mut self, index: usize) -> &mut Database {
        if index >= self.dbs.len() {
            self.dbs.resize_with(index + 1, Database::default);
        }
        &mut self.dbs[index]
    }
}

/// Handle to the shared database set. Cheaply cloneable; every connection
/// holds one.
#[derive(Debug, Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

/// Wrapper around `Db` held for the server's single, long-lived instance.
/// The final snapshot on shutdown is taken explicitly by `server::run`, so
/// this is a thin marker, kept for symmetry with the handle it wraps.
#[derive(Debug)]
pub struct DbDropGuard {
    db: Db,
}

impl DbDropGuard {
    pub fn new() -> DbDropGuard {
        DbDropGuard { db: Db::new() }
    }

    pub fn db(&self) -> Db {
        self.db.clone()
    }
}

impl Default for DbDropGuard {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_millis() as u64
}

fn wrong_type() -> Frame {
    Frame::Error(DbError::WrongType.to_string())
}

fn not_an_integer() -> Frame {
    Frame::Error(DbError::NotAnInteger.to_string())
}

impl Db {
    pub fn new() -> Db {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                dbs: vec![Database::default()],
                last_save_ms: None,
            }),
            pubsub: PubSub::default(),
        });
        Db { shared }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap()
    }

    fn touch(state: &mut State, index: usize, now: u64) {
        let db = state.ensure_db(index);
        db.sample_sweep(now);
    }

    fn with_db<R>(&self, index: usize, f: impl FnOnce(&mut Database, u64) -> R) -> R {
        let now = now_ms();
        let mut state = self.lock();
        Db::touch(&mut state, index, now);
        let db = state.ensure_db(index);
        f(db, now)
    }

    // ---- Keys ------------------------------------------------------

    pub fn del(&self, index: usize, keys: &[Bytes]) -> Frame {
        self.with_db(index, |db, now| {
            let mut removed = 0i64;
            for key in keys {
                db.expire_if_due(key, now);
                if db.entries.remove(key).is_some() {
                    db.expirations.remove(key);
                    removed += 1;
                }
            }
            Frame::Integer(removed)
        })
    }

    pub fn exists(&self, index: usize, keys: &[Bytes]) -> Frame {
        self.with_db(index, |db, now| {
            let mut count = 0i64;
            for key in keys {
                db.expire_if_due(key, now);
                if db.entries.contains_key(key.as_ref()) {
                    count += 1;
                }
            }
            Frame::Integer(count)
        })
    }

    /// Shared implementation for `EXPIRE`/`EXPIREAT`/`PEXPIRE`/`PEXPIREAT`.
    /// `deadline_ms` has already been resolved to an absolute millisecond
    /// deadline by the caller.
    pub fn set_expiration(&self, index: usize, key: &Bytes, deadline_ms: u64) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            if !db.entries.contains_key(key.as_ref()) {
                return Frame::Integer(0);
            }
            db.expirations.insert(key.clone(), deadline_ms);
            Frame::Integer(1)
        })
    }

    pub fn persist(&self, index: usize, key: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            if db.expirations.remove(key.as_ref()).is_some() {
                Frame::Integer(1)
            } else {
                Frame::Integer(0)
            }
        })
    }

    pub fn ttl(&self, index: usize, key: &Bytes, millis: bool) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            if !db.entries.contains_key(key.as_ref()) {
                return Frame::Integer(-2);
            }
            match db.expirations.get(key.as_ref()) {
                None => Frame::Integer(-1),
                Some(deadline) => {
                    let remaining_ms = deadline.saturating_sub(now);
                    let value = if millis {
                        remaining_ms
                    } else {
                        (remaining_ms + 500) / 1000
                    };
                    Frame::Integer(value as i64)
                }
            }
        })
    }

    pub fn keys(&self, index: usize, pattern: &str) -> Frame {
        self.with_db(index, |db, now| {
            let due: Vec<Bytes> = db
                .expirations
                .iter()
                .filter(|(_, deadline)| **deadline <= now)
                .map(|(k, _)| k.clone())
                .collect();
            for key in &due {
                db.entries.remove(key);
                db.expirations.remove(key);
            }

            let pattern = pattern.as_bytes();
            let items = db
                .entries
                .keys()
                .filter(|k| glob::matches(pattern, k))
                .map(|k| Frame::Bulk(k.clone()))
                .collect();
            Frame::Array(items)
        })
    }

    pub fn randomkey(&self, index: usize) -> Frame {
        self.with_db(index, |db, _now| {
            let mut rng = rand::thread_rng();
            match db.entries.keys().choose(&mut rng) {
                Some(key) => Frame::Bulk(key.clone()),
                None => Frame::Null,
            }
        })
    }

    pub fn rename(&self, index: usize, src: &Bytes, dst: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(src, now);
            let Some(value) = db.entries.remove(src.as_ref()) else {
                return Frame::Error("ERR no such key".to_string());
            };
            let ttl = db.expirations.remove(src.as_ref());

            db.entries.insert(dst.clone(), value);
            match ttl {
                Some(deadline) => {
                    db.expirations.insert(dst.clone(), deadline);
                }
                None => {
                    db.expirations.remove(dst.as_ref());
                }
            }
            Frame::Simple("OK".to_string())
        })
    }

    pub fn renamenx(&self, index: usize, src: &Bytes, dst: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(src, now);
            db.expire_if_due(dst, now);
            if !db.entries.contains_key(src.as_ref()) {
                return Frame::Error("ERR no such key".to_string());
            }
            if db.entries.contains_key(dst.as_ref()) {
                return Frame::Integer(0);
            }
            let value = db.entries.remove(src.as_ref()).unwrap();
            let ttl = db.expirations.remove(src.as_ref());
            db.entries.insert(dst.clone(), value);
            if let Some(deadline) = ttl {
                db.expirations.insert(dst.clone(), deadline);
            }
            Frame::Integer(1)
        })
    }

    pub fn move_key(&self, index: usize, key: &Bytes, dest_index: usize) -> Frame {
        if index == dest_index {
            return Frame::Error("ERR source and destination objects are the same".to_string());
        }
        let now = now_ms();
        let mut state = self.lock();
        Db::touch(&mut state, index, now);
        Db::touch(&mut state, dest_index, now);

        {
            let src_db = state.ensure_db(index);
            src_db.expire_if_due(key, now);
            if !src_db.entries.contains_key(key.as_ref()) {
                return Frame::Integer(0);
            }
        }
        if state.ensure_db(dest_index).entries.contains_key(key.as_ref()) {
            return Frame::Integer(0);
        }

        let src_db = state.ensure_db(index);
        let value = src_db.entries.remove(key.as_ref()).unwrap();
        let ttl = src_db.expirations.remove(key.as_ref());

        let dest_db = state.ensure_db(dest_index);
        dest_db.entries.insert(key.clone(), value);
        if let Some(deadline) = ttl {
            dest_db.expirations.insert(key.clone(), deadline);
        }
        Frame::Integer(1)
    }

    pub fn key_type(&self, index: usize, key: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            let name = db
                .entries
                .get(key.as_ref())
                .map(Value::type_name)
                .unwrap_or("none");
            Frame::Simple(name.to_string())
        })
    }

    /// `DUMP key` has no wire-compatible serialization format to target here;
    /// like the reference implementation this is derived from, it just
    /// stringifies whatever is stored so the bytes are at least inspectable.
    pub fn dump(&self, index: usize, key: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get(key.as_ref()) {
                Some(Value::String(v)) => Frame::Bulk(v.clone()),
                Some(Value::List(items)) => Frame::Bulk(Bytes::from(format!("{:?}", items))),
                Some(Value::Hash(map)) => Frame::Bulk(Bytes::from(format!("{:?}", map))),
                None => Frame::Null,
            }
        })
    }

    pub fn flushdb(&self, index: usize) -> Frame {
        self.with_db(index, |db, _now| {
            db.clear();
            Frame::Simple("OK".to_string())
        })
    }

    pub fn flushall(&self) -> Frame {
        let mut state = self.lock();
        for db in state.dbs.iter_mut() {
            db.clear();
        }
        Frame::Simple("OK".to_string())
    }

    // ---- Strings ----------------------------------------------------

    pub fn get(&self, index: usize, key: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get(key.as_ref()) {
                Some(Value::String(v)) => Frame::Bulk(v.clone()),
                Some(_) => wrong_type(),
                None => Frame::Null,
            }
        })
    }

    pub fn mget(&self, index: usize, keys: &[Bytes]) -> Frame {
        self.with_db(index, |db, now| {
            let mut out = Vec::with_capacity(keys.len());
            for key in keys {
                db.expire_if_due(key, now);
                out.push(match db.entries.get(key.as_ref()) {
                    Some(Value::String(v)) => Frame::Bulk(v.clone()),
                    _ => Frame::Null,
                });
            }
            Frame::Array(out)
        })
    }

    pub fn set(&self, index: usize, key: &Bytes, value: Bytes, expire_ms: Option<u64>) -> Frame {
        self.with_db(index, |db, now| {
            db.entries.insert(key.clone(), Value::String(value));
            db.expirations.remove(key.as_ref());
            if let Some(ttl) = expire_ms {
                db.expirations.insert(key.clone(), now + ttl);
            }
            Frame::Simple("OK".to_string())
        })
    }

    pub fn mset(&self, index: usize, pairs: &[(Bytes, Bytes)]) -> Frame {
        self.with_db(index, |db, _now| {
            for (key, value) in pairs {
                db.entries.insert(key.clone(), Value::String(value.clone()));
                db.expirations.remove(key.as_ref());
            }
            Frame::Simple("OK".to_string())
        })
    }

    pub fn setnx(&self, index: usize, key: &Bytes, value: Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            if db.entries.contains_key(key.as_ref()) {
                return Frame::Integer(0);
            }
            db.entries.insert(key.clone(), Value::String(value));
            Frame::Integer(1)
        })
    }

    pub fn getset(&self, index: usize, key: &Bytes, value: Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            let old = match db.entries.get(key.as_ref()) {
                Some(Value::String(v)) => Frame::Bulk(v.clone()),
                Some(_) => return wrong_type(),
                None => Frame::Null,
            };
            db.entries.insert(key.clone(), Value::String(value));
            db.expirations.remove(key.as_ref());
            old
        })
    }

    pub fn append(&self, index: usize, key: &Bytes, value: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get_mut(key.as_ref()) {
                Some(Value::String(existing)) => {
                    let mut buf = existing.to_vec();
                    buf.extend_from_slice(value);
                    let len = buf.len();
                    *existing = Bytes::from(buf);
                    Frame::Integer(len as i64)
                }
                Some(_) => wrong_type(),
                None => {
                    let len = value.len();
                    db.entries.insert(key.clone(), Value::String(value.clone()));
                    Frame::Integer(len as i64)
                }
            }
        })
    }

    pub fn strlen(&self, index: usize, key: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get(key.as_ref()) {
                Some(Value::String(v)) => Frame::Integer(v.len() as i64),
                Some(_) => wrong_type(),
                None => Frame::Integer(0),
            }
        })
    }

    /// Shared implementation of `INCR`/`INCRBY`/`DECR`/`DECRBY`. `by` already
    /// has its sign flipped by the caller for the decrement variants.
    pub fn incr_by(&self, index: usize, key: &Bytes, by: i64) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            let current = match db.entries.get(key.as_ref()) {
                None => 0i64,
                Some(Value::String(v)) => match std::str::from_utf8(v)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                {
                    Some(n) => n,
                    None => return not_an_integer(),
                },
                Some(_) => return wrong_type(),
            };

            let Some(next) = current.checked_add(by) else {
                return Frame::Error("ERR increment or decrement would overflow".to_string());
            };
            db.entries
                .insert(key.clone(), Value::String(Bytes::from(next.to_string())));
            Frame::Integer(next)
        })
    }

    // ---- Lists --------------------------------------------------------

    pub fn push(&self, index: usize, key: &Bytes, items: &[Bytes], left: bool) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            let list = match db
                .entries
                .entry(key.clone())
                .or_insert_with(|| Value::List(VecDeque::new()))
            {
                Value::List(list) => list,
                _ => return wrong_type(),
            };
            for item in items {
                if left {
                    list.push_front(item.clone());
                } else {
                    list.push_back(item.clone());
                }
            }
            Frame::Integer(list.len() as i64)
        })
    }

    pub fn pop(&self, index: usize, key: &Bytes, left: bool, count: i64) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            let list = match db.entries.get_mut(key.as_ref()) {
                Some(Value::List(list)) => list,
                Some(_) => return wrong_type(),
                None => return Frame::Null,
            };

            if count <= 1 {
                let popped = if left {
                    list.pop_front()
                } else {
                    list.pop_back()
                };
                if list.is_empty() {
                    db.entries.remove(key.as_ref());
                    db.expirations.remove(key.as_ref());
                }
                return match popped {
                    Some(v) => Frame::Bulk(v),
                    None => Frame::Null,
                };
            }

            let n = (count as usize).min(list.len());
            let mut out = Vec::with_capacity(n);
            for _ in 0..n {
                let item = if left {
                    list.pop_front()
                } else {
                    list.pop_back()
                };
                match item {
                    Some(v) => out.push(Frame::Bulk(v)),
                    None => break,
                }
            }
            if list.is_empty() {
                db.entries.remove(key.as_ref());
                db.expirations.remove(key.as_ref());
            }
            Frame::Array(out)
        })
    }

    pub fn llen(&self, index: usize, key: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get(key.as_ref()) {
                Some(Value::List(list)) => Frame::Integer(list.len() as i64),
                Some(_) => wrong_type(),
                None => Frame::Integer(0),
            }
        })
    }

    pub fn lrange(&self, index: usize, key: &Bytes, start: i64, stop: i64) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            let list = match db.entries.get(key.as_ref()) {
                Some(Value::List(list)) => list,
                Some(_) => return wrong_type(),
                None => return Frame::NullArray,
            };

            let len = list.len() as i64;
            let (mut start, mut stop) = (start, stop);
            if start < 0 {
                start += len;
            }
            if stop < 0 {
                stop += len;
            }
            start = start.max(0);
            stop = stop.min(len - 1);

            if len == 0 || start > stop || start >= len {
                return Frame::Array(vec![]);
            }

            let items = list
                .iter()
                .skip(start as usize)
                .take((stop - start + 1) as usize)
                .map(|v| Frame::Bulk(v.clone()))
                .collect();
            Frame::Array(items)
        })
    }

    // ---- Hashes -------------------------------------------------------

    pub fn hset(&self, index: usize, key: &Bytes, fields: &[(Bytes, Bytes)], nx: bool) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            let hash = match db
                .entries
                .entry(key.clone())
                .or_insert_with(|| Value::Hash(HashMap::new()))
            {
                Value::Hash(hash) => hash,
                _ => return wrong_type(),
            };

            if nx {
                let (field, value) = &fields[0];
                if hash.contains_key(field.as_ref()) {
                    return Frame::Integer(0);
                }
                hash.insert(field.clone(), value.clone());
                return Frame::Integer(1);
            }

            let mut added = 0i64;
            for (field, value) in fields {
                if hash.insert(field.clone(), value.clone()).is_none() {
                    added += 1;
                }
            }
            Frame::Integer(added)
        })
    }

    pub fn hget(&self, index: usize, key: &Bytes, field: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get(key.as_ref()) {
                Some(Value::Hash(hash)) => match hash.get(field.as_ref()) {
                    Some(v) => Frame::Bulk(v.clone()),
                    None => Frame::Null,
                },
                Some(_) => wrong_type(),
                None => Frame::Null,
            }
        })
    }

    pub fn hmget(&self, index: usize, key: &Bytes, fields: &[Bytes]) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            let hash = match db.entries.get(key.as_ref()) {
                Some(Value::Hash(hash)) => Some(hash),
                Some(_) => return wrong_type(),
                None => None,
            };
            let out = fields
                .iter()
                .map(|f| match hash.and_then(|h| h.get(f.as_ref())) {
                    Some(v) => Frame::Bulk(v.clone()),
                    None => Frame::Null,
                })
                .collect();
            Frame::Array(out)
        })
    }

    pub fn hdel(&self, index: usize, key: &Bytes, fields: &[Bytes]) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            let Some(Value::Hash(hash)) = db.entries.get_mut(key.as_ref()) else {
                return match db.entries.get(key.as_ref()) {
                    Some(_) => wrong_type(),
                    None => Frame::Integer(0),
                };
            };
            let mut removed = 0i64;
            for field in fields {
                if hash.remove(field.as_ref()).is_some() {
                    removed += 1;
                }
            }
            if hash.is_empty() {
                db.entries.remove(key.as_ref());
                db.expirations.remove(key.as_ref());
            }
            Frame::Integer(removed)
        })
    }

    pub fn hexists(&self, index: usize, key: &Bytes, field: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get(key.as_ref()) {
                Some(Value::Hash(hash)) => {
                    Frame::Integer(hash.contains_key(field.as_ref()) as i64)
                }
                Some(_) => wrong_type(),
                None => Frame::Integer(0),
            }
        })
    }

    pub fn hgetall(&self, index: usize, key: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get(key.as_ref()) {
                Some(Value::Hash(hash)) => {
                    let mut out = Vec::with_capacity(hash.len() * 2);
                    for (field, value) in hash {
                        out.push(Frame::Bulk(field.clone()));
                        out.push(Frame::Bulk(value.clone()));
                    }
                    Frame::Array(out)
                }
                Some(_) => wrong_type(),
                None => Frame::Array(vec![]),
            }
        })
    }

    pub fn hkeys(&self, index: usize, key: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get(key.as_ref()) {
                Some(Value::Hash(hash)) => {
                    Frame::Array(hash.keys().map(|k| Frame::Bulk(k.clone())).collect())
                }
                Some(_) => wrong_type(),
                None => Frame::Array(vec![]),
            }
        })
    }

    pub fn hvals(&self, index: usize, key: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get(key.as_ref()) {
                Some(Value::Hash(hash)) => {
                    Frame::Array(hash.values().map(|v| Frame::Bulk(v.clone())).collect())
                }
                Some(_) => wrong_type(),
                None => Frame::Array(vec![]),
            }
        })
    }

    pub fn hlen(&self, index: usize, key: &Bytes) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            match db.entries.get(key.as_ref()) {
                Some(Value::Hash(hash)) => Frame::Integer(hash.len() as i64),
                Some(_) => wrong_type(),
                None => Frame::Integer(0),
            }
        })
    }

    pub fn hincrby(&self, index: usize, key: &Bytes, field: &Bytes, by: i64) -> Frame {
        self.with_db(index, |db, now| {
            db.expire_if_due(key, now);
            let hash = match db
                .entries
                .entry(key.clone())
                .or_insert_with(|| Value::Hash(HashMap::new()))
            {
                Value::Hash(hash) => hash,
                _ => return wrong_type(),
            };

            let current = match hash.get(field.as_ref()) {
                None => 0i64,
                Some(v) => match std::str::from_utf8(v).ok().and_then(|s| s.parse::<i64>().ok()) {
                    Some(n) => n,
                    None => return not_an_integer(),
                },
            };
            let Some(next) = current.checked_add(by) else {
                return Frame::Error("ERR increment or decrement would overflow".to_string());
            };
            hash.insert(field.clone(), Bytes::from(next.to_string()));
            Frame::Integer(next)
        })
    }

    // ---- PubSub ---------------------------------------------------------

    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Bytes> {
        self.shared.pubsub.subscribe(channel)
    }

    pub fn psubscribe(&self, pattern: &str) -> broadcast::Receiver<(String, Bytes)> {
        self.shared.pubsub.psubscribe(pattern)
    }

    pub fn publish(&self, channel: &str, message: Bytes) -> usize {
        self.shared.pubsub.publish(channel, message)
    }

    // ---- Snapshotting -----------------------------------------------------

    /// Clones the full database set for the snapshot store to serialize.
    /// Cloning under the lock, rather than holding the lock across the I/O,
    /// is what lets `BGSAVE` stay consistent without blocking other commands
    /// for the duration of the write.
    pub(crate) fn snapshot(&self) -> (Vec<Database>, u64) {
        let mut state = self.lock();
        let ts = now_ms();
        state.last_save_ms = Some(ts);
        (state.dbs.clone(), ts)
    }

    pub(crate) fn restore(&self, dbs: Vec<Database>) {
        let mut state = self.lock();
        state.dbs = dbs;
    }

    pub fn last_save_ms(&self) -> Option<u64> {
        self.lock().last_save_ms
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    #[test]
    fn set_then_get_round_trips() {
        let db = Db::new();
        db.set(0, &key("a"), Bytes::from_static(b"1"), None);
        assert!(matches!(db.get(0, &key("a")), Frame::Bulk(v) if v.as_ref() == b"1"));
        assert!(matches!(db.get(0, &key("missing")), Frame::Null));
    }

    #[test]
    fn wrong_type_access_errors_instead_of_panicking() {
        let db = Db::new();
        db.push(0, &key("list"), &[Bytes::from_static(b"x")], true);
        assert!(matches!(db.get(0, &key("list")), Frame::Error(_)));
    }

    #[test]
    fn expire_then_lazily_evicted_on_read() {
        let db = Db::new();
        db.set(0, &key("a"), Bytes::from_static(b"1"), None);
        db.set_expiration(0, &key("a"), now_ms());

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(matches!(db.get(0, &key("a")), Frame::Null));
        assert!(matches!(db.exists(0, &[key("a")]), Frame::Integer(0)));
    }

    #[test]
    fn persist_clears_a_deadline() {
        let db = Db::new();
        db.set(0, &key("a"), Bytes::from_static(b"1"), None);
        db.set_expiration(0, &key("a"), now_ms() + 60_000);
        assert!(matches!(db.ttl(0, &key("a"), false), Frame::Integer(n) if n > 0));

        db.persist(0, &key("a"));
        assert!(matches!(db.ttl(0, &key("a"), false), Frame::Integer(-1)));
    }

    #[test]
    fn ttl_on_a_missing_key_is_minus_two() {
        let db = Db::new();
        assert!(matches!(db.ttl(0, &key("nope"), false), Frame::Integer(-2)));
    }

    #[test]
    fn select_equivalent_move_is_per_index_keyspace() {
        let db = Db::new();
        db.set(0, &key("a"), Bytes::from_static(b"1"), None);
        db.move_key(0, &key("a"), 1);

        assert!(matches!(db.get(0, &key("a")), Frame::Null));
        assert!(matches!(db.get(1, &key("a")), Frame::Bulk(v) if v.as_ref() == b"1"));
    }

    #[test]
    fn hash_set_get_and_delete() {
        let db = Db::new();
        let fields = vec![(key("f1"), key("v1")), (key("f2"), key("v2"))];
        db.hset(0, &key("h"), &fields, false);

        assert!(matches!(db.hget(0, &key("h"), &key("f1")), Frame::Bulk(v) if v.as_ref() == b"v1"));
        assert!(matches!(db.hlen(0, &key("h")), Frame::Integer(2)));

        db.hdel(0, &key("h"), &[key("f1")]);
        assert!(matches!(db.hget(0, &key("h"), &key("f1")), Frame::Null));
        assert!(matches!(db.hlen(0, &key("h")), Frame::Integer(1)));
    }

    #[test]
    fn list_push_pop_and_range() {
        let db = Db::new();
        db.push(0, &key("l"), &[key("a")], false);
        db.push(0, &key("l"), &[key("b")], false);
        assert!(matches!(db.llen(0, &key("l")), Frame::Integer(2)));

        match db.lrange(0, &key("l"), 0, -1) {
            Frame::Array(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(&items[0], Frame::Bulk(v) if v.as_ref() == b"a"));
                assert!(matches!(&items[1], Frame::Bulk(v) if v.as_ref() == b"b"));
            }
            other => panic!("expected array, got {other:?}"),
        }

        assert!(matches!(db.pop(0, &key("l"), true, 1), Frame::Bulk(v) if v.as_ref() == b"a"));
    }

    #[test]
    fn flushdb_only_clears_the_selected_database() {
        let db = Db::new();
        db.set(0, &key("a"), Bytes::from_static(b"1"), None);
        db.set(1, &key("b"), Bytes::from_static(b"2"), None);

        db.flushdb(0);
        assert!(matches!(db.get(0, &key("a")), Frame::Null));
        assert!(matches!(db.get(1, &key("b")), Frame::Bulk(_)));
    }

    #[test]
    fn publish_counts_exact_and_pattern_subscribers() {
        let db = Db::new();
        let _exact = db.subscribe("news");
        let _pattern = db.psubscribe("ne*");

        let delivered = db.publish("news", Bytes::from_static(b"hello"));
        assert_eq!(delivered, 2);
    }

    #[test]
    fn snapshot_and_restore_round_trip_the_dataset() {
        let db = Db::new();
        db.set(0, &key("a"), Bytes::from_static(b"1"), None);

        let (dbs, _) = db.snapshot();
        assert!(db.last_save_ms().is_some());

        let restored = Db::new();
        restored.restore(dbs);
        assert!(matches!(restored.get(0, &key("a")), Frame::Bulk(v) if v.as_ref() == b"1"));
    }
}
