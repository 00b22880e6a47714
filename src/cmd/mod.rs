mod get;
pub use get::Get;

mod set;
pub use set::Set;

mod setnx;
pub use setnx::SetNx;

mod getset;
pub use getset::GetSet;

mod append;
pub use append::Append;

mod mget;
pub use mget::Mget;

mod mset;
pub use mset::Mset;

mod strlen;
pub use strlen::Strlen;

mod incrdecr;
pub use incrdecr::IncrDecr;

mod del;
pub use del::Del;

mod exists;
pub use exists::Exists;

mod cmdtype;
pub use cmdtype::Type;

mod dump;
pub use dump::Dump;

mod persist;
pub use persist::Persist;

mod mv;
pub use mv::Move;

mod randomkey;
pub use randomkey::RandomKey;

mod rename;
pub use rename::Rename;

mod expire;
pub use expire::Expire;

mod ttl;
pub use ttl::TTL;

mod keys;
pub use keys::Keys;

mod push;
pub use push::Push;

mod pop;
pub use pop::Pop;

mod llen;
pub use llen::Llen;

mod lrange;
pub use lrange::Lrange;

mod hset;
pub use hset::Hset;

mod hmset;
pub use hmset::Hmset;

mod hget;
pub use hget::Hget;

mod hmget;
pub use hmget::Hmget;

mod hdel;
pub use hdel::Hdel;

mod hexists;
pub use hexists::Hexists;

mod hgetall;
pub use hgetall::Hgetall;

mod hkeys;
pub use hkeys::Hkeys;

mod hvals;
pub use hvals::Hvals;

mod hlen;
pub use hlen::Hlen;

mod hincrby;
pub use hincrby::Hincrby;

mod ping;
pub use ping::Ping;

mod select;
pub use select::Select;

mod flushdb;
pub use flushdb::FlushDb;

mod flushall;
pub use flushall::FlushAll;

mod save;
pub use save::Save;

mod bgsave;
pub use bgsave::BgSave;

mod lastsave;
pub use lastsave::LastSave;

mod shutdown;
pub use shutdown::ShutdownCmd;

mod quit;
pub use quit::Quit;

mod subscribe;
pub use subscribe::{Subscribe, Unsubscribe};

mod psubscribe;
pub use psubscribe::{PSubscribe, PUnsubscribe};

mod publish;
pub use publish::Publish;

mod unknown;
pub use unknown::Unknown;

use crate::{Connection, Db, Frame, Parse, Shutdown};

use std::path::Path;

/// Enumeration of supported commands.
///
/// Methods called on `Command` are delegated to the individual command
/// implementation.
#[derive(Debug)]
pub enum Command {
    // keys
    Del(Del),
    Dump(Dump),
    Exists(Exists),
    Expire(Expire),
    ExpireAt(Expire),
    Pexpire(Expire),
    PexpireAt(Expire),
    Persist(Persist),
    TTL(TTL),
    PTTL(TTL),
    Keys(Keys),
    Move(Move),
    RandomKey(RandomKey),
    Rename(Rename),
    RenameNx(Rename),
    Type(Type),

    // strings
    Get(Get),
    Set(Set),
    SetNx(SetNx),
    GetSet(GetSet),
    Mget(Mget),
    Incr(IncrDecr),
    Decr(IncrDecr),
    Append(Append),
    Strlen(Strlen),
    Mset(Mset),

    // lists
    Lpush(Push),
    Rpush(Push),
    Lpop(Pop),
    Rpop(Pop),
    Llen(Llen),
    Lrange(Lrange),

    // hashes
    Hset(Hset),
    Hmset(Hmset),
    Hget(Hget),
    Hdel(Hdel),
    Hexists(Hexists),
    Hgetall(Hgetall),
    Hkeys(Hkeys),
    Hvals(Hvals),
    Hlen(Hlen),
    Hmget(Hmget),
    Hincrby(Hincrby),

    // server
    Ping(Ping),
    Select(Select),
    FlushDb(FlushDb),
    FlushAll(FlushAll),
    Save(Save),
    BgSave(BgSave),
    LastSave(LastSave),
    Shutdown(ShutdownCmd),
    Quit(Quit),

    // pubsub
    Subscribe(Subscribe),
    Unsubscribe(Unsubscribe),
    PSubscribe(PSubscribe),
    PUnsubscribe(PUnsubscribe),
    Publish(Publish),

    Unknown(Unknown),
}

impl Command {
    /// Parses a command out of a received frame.
    ///
    /// `frame` must be the array variant holding the command name and its
    /// arguments. Returns `Command::Unknown` for anything not in the
    /// supported surface, rather than an error, so the caller can still
    /// reply with a normal RESP error instead of tearing down the
    /// connection.
    pub fn from_frame(frame: Frame) -> crate::Result<Command> {
        let mut parse = Parse::new(frame)?;

        let command_name = parse.next_string()?.to_lowercase();

        let command = match &command_name[..] {
            "del" => Command::Del(transform_parse(Del::parse_frames(&mut parse), &mut parse)),
            "dump" => Command::Dump(transform_parse(Dump::parse_frames(&mut parse), &mut parse)),
            "exists" => Command::Exists(transform_parse(
                Exists::parse_frames(&mut parse),
                &mut parse,
            )),
            "expire" => Command::Expire(transform_parse(
                Expire::parse_frames(&mut parse),
                &mut parse,
            )),
            "expireat" => Command::ExpireAt(transform_parse(
                Expire::parse_frames(&mut parse),
                &mut parse,
            )),
            "pexpire" => Command::Pexpire(transform_parse(
                Expire::parse_frames(&mut parse),
                &mut parse,
            )),
            "pexpireat" => Command::PexpireAt(transform_parse(
                Expire::parse_frames(&mut parse),
                &mut parse,
            )),
            "persist" => Command::Persist(transform_parse(
                Persist::parse_frames(&mut parse),
                &mut parse,
            )),
            "ttl" => Command::TTL(transform_parse(TTL::parse_frames(&mut parse), &mut parse)),
            "pttl" => Command::PTTL(transform_parse(TTL::parse_frames(&mut parse), &mut parse)),
            "keys" => Command::Keys(transform_parse(Keys::parse_frames(&mut parse), &mut parse)),
            "move" => Command::Move(transform_parse(Move::parse_frames(&mut parse), &mut parse)),
            "randomkey" => Command::RandomKey(RandomKey),
            "rename" => Command::Rename(transform_parse(
                Rename::parse_frames(&mut parse),
                &mut parse,
            )),
            "renamenx" => Command::RenameNx(transform_parse(
                Rename::parse_frames(&mut parse),
                &mut parse,
            )),
            "type" => Command::Type(transform_parse(Type::parse_frames(&mut parse), &mut parse)),

            "get" => Command::Get(transform_parse(Get::parse_frames(&mut parse), &mut parse)),
            "set" => Command::Set(transform_parse(Set::parse_frames(&mut parse), &mut parse)),
            "setnx" => Command::SetNx(transform_parse(
                SetNx::parse_frames(&mut parse),
                &mut parse,
            )),
            "getset" => Command::GetSet(transform_parse(
                GetSet::parse_frames(&mut parse),
                &mut parse,
            )),
            "mget" => Command::Mget(transform_parse(Mget::parse_frames(&mut parse), &mut parse)),
            "incr" => Command::Incr(transform_parse(
                IncrDecr::parse_frames(&mut parse, true),
                &mut parse,
            )),
            "decr" => Command::Decr(transform_parse(
                IncrDecr::parse_frames(&mut parse, true),
                &mut parse,
            )),
            "incrby" => Command::Incr(transform_parse(
                IncrDecr::parse_frames(&mut parse, false),
                &mut parse,
            )),
            "decrby" => Command::Decr(transform_parse(
                IncrDecr::parse_frames(&mut parse, false),
                &mut parse,
            )),
            "append" => Command::Append(transform_parse(
                Append::parse_frames(&mut parse),
                &mut parse,
            )),
            "strlen" => Command::Strlen(transform_parse(
                Strlen::parse_frames(&mut parse),
                &mut parse,
            )),
            "mset" => Command::Mset(transform_parse(Mset::parse_frames(&mut parse), &mut parse)),

            "lpush" => Command::Lpush(transform_parse(Push::parse_frames(&mut parse), &mut parse)),
            "rpush" => Command::Rpush(transform_parse(Push::parse_frames(&mut parse), &mut parse)),
            "lpop" => Command::Lpop(transform_parse(Pop::parse_frames(&mut parse), &mut parse)),
            "rpop" => Command::Rpop(transform_parse(Pop::parse_frames(&mut parse), &mut parse)),
            "llen" => Command::Llen(transform_parse(Llen::parse_frames(&mut parse), &mut parse)),
            "lrange" => Command::Lrange(transform_parse(
                Lrange::parse_frames(&mut parse),
                &mut parse,
            )),

            "hset" => Command::Hset(transform_parse(Hset::parse_frames(&mut parse), &mut parse)),
            "hmset" => {
                Command::Hmset(transform_parse(Hmset::parse_frames(&mut parse), &mut parse))
            }
            "hget" => Command::Hget(transform_parse(Hget::parse_frames(&mut parse), &mut parse)),
            "hdel" => Command::Hdel(transform_parse(Hdel::parse_frames(&mut parse), &mut parse)),
            "hexists" => Command::Hexists(transform_parse(
                Hexists::parse_frames(&mut parse),
                &mut parse,
            )),
            "hgetall" => Command::Hgetall(transform_parse(
                Hgetall::parse_frames(&mut parse),
                &mut parse,
            )),
            "hkeys" => Command::Hkeys(transform_parse(Hkeys::parse_frames(&mut parse), &mut parse)),
            "hvals" => Command::Hvals(transform_parse(Hvals::parse_frames(&mut parse), &mut parse)),
            "hlen" => Command::Hlen(transform_parse(Hlen::parse_frames(&mut parse), &mut parse)),
            "hmget" => Command::Hmget(transform_parse(Hmget::parse_frames(&mut parse), &mut parse)),
            "hincrby" => Command::Hincrby(transform_parse(
                Hincrby::parse_frames(&mut parse),
                &mut parse,
            )),

            "ping" => Command::Ping(transform_parse(Ping::parse_frames(&mut parse), &mut parse)),
            "select" => Command::Select(transform_parse(
                Select::parse_frames(&mut parse),
                &mut parse,
            )),
            "flushdb" => Command::FlushDb(FlushDb),
            "flushall" => Command::FlushAll(FlushAll),
            "save" => Command::Save(Save),
            "bgsave" => Command::BgSave(BgSave),
            "lastsave" => Command::LastSave(LastSave),
            "shutdown" => Command::Shutdown(transform_parse(
                ShutdownCmd::parse_frames(&mut parse),
                &mut parse,
            )),
            "quit" => Command::Quit(Quit),

            "subscribe" => Command::Subscribe(transform_parse(
                Subscribe::parse_frames(&mut parse),
                &mut parse,
            )),
            "unsubscribe" => Command::Unsubscribe(transform_parse(
                Unsubscribe::parse_frames(&mut parse),
                &mut parse,
            )),
            "psubscribe" => Command::PSubscribe(transform_parse(
                PSubscribe::parse_frames(&mut parse),
                &mut parse,
            )),
            "punsubscribe" => Command::PUnsubscribe(transform_parse(
                PUnsubscribe::parse_frames(&mut parse),
                &mut parse,
            )),
            "publish" => Command::Publish(transform_parse(
                Publish::parse_frames(&mut parse),
                &mut parse,
            )),

            _ => {
                return Ok(Command::Unknown(Unknown::new(command_name)));
            }
        };

        parse.finish()?;

        Ok(command)
    }

    /// Applies the command against `db`, writing its reply to `dst`.
    ///
    /// `Select`, `Shutdown`, and `Quit` are not handled here: they need to
    /// mutate or terminate connection-level state the command layer does not
    /// own, so the server loop matches on them directly before falling back
    /// to this method.
    pub(crate) async fn apply(
        self,
        db: &Db,
        index: usize,
        data_dir: &Path,
        dst: &mut Connection,
        shutdown: &mut Shutdown,
    ) -> crate::Result<()> {
        use Command::*;

        match self {
            Del(cmd) => cmd.apply(db, index, dst).await,
            Dump(cmd) => cmd.apply(db, index, dst).await,
            Exists(cmd) => cmd.apply(db, index, dst).await,
            Expire(cmd) => cmd.apply(db, index, dst, false, false).await,
            ExpireAt(cmd) => cmd.apply(db, index, dst, false, true).await,
            Pexpire(cmd) => cmd.apply(db, index, dst, true, false).await,
            PexpireAt(cmd) => cmd.apply(db, index, dst, true, true).await,
            Persist(cmd) => cmd.apply(db, index, dst).await,
            TTL(cmd) => cmd.apply(db, index, dst, false).await,
            PTTL(cmd) => cmd.apply(db, index, dst, true).await,
            Keys(cmd) => cmd.apply(db, index, dst).await,
            Move(cmd) => cmd.apply(db, index, dst).await,
            RandomKey(cmd) => cmd.apply(db, index, dst).await,
            Rename(cmd) => cmd.apply(db, index, dst, false).await,
            RenameNx(cmd) => cmd.apply(db, index, dst, true).await,
            Type(cmd) => cmd.apply(db, index, dst).await,

            Get(cmd) => cmd.apply(db, index, dst).await,
            Set(cmd) => cmd.apply(db, index, dst).await,
            SetNx(cmd) => cmd.apply(db, index, dst).await,
            GetSet(cmd) => cmd.apply(db, index, dst).await,
            Mget(cmd) => cmd.apply(db, index, dst).await,
            Incr(cmd) => cmd.apply(db, index, dst, true).await,
            Decr(cmd) => cmd.apply(db, index, dst, false).await,
            Append(cmd) => cmd.apply(db, index, dst).await,
            Strlen(cmd) => cmd.apply(db, index, dst).await,
            Mset(cmd) => cmd.apply(db, index, dst).await,

            Lpush(cmd) => cmd.apply(db, index, dst, true).await,
            Rpush(cmd) => cmd.apply(db, index, dst, false).await,
            Lpop(cmd) => cmd.apply(db, index, dst, true).await,
            Rpop(cmd) => cmd.apply(db, index, dst, false).await,
            Llen(cmd) => cmd.apply(db, index, dst).await,
            Lrange(cmd) => cmd.apply(db, index, dst).await,

            Hset(cmd) => cmd.apply(db, index, dst, false).await,
            Hmset(cmd) => cmd.apply(db, index, dst).await,
            Hget(cmd) => cmd.apply(db, index, dst).await,
            Hdel(cmd) => cmd.apply(db, index, dst).await,
            Hexists(cmd) => cmd.apply(db, index, dst).await,
            Hgetall(cmd) => cmd.apply(db, index, dst).await,
            Hkeys(cmd) => cmd.apply(db, index, dst).await,
            Hvals(cmd) => cmd.apply(db, index, dst).await,
            Hlen(cmd) => cmd.apply(db, index, dst).await,
            Hmget(cmd) => cmd.apply(db, index, dst).await,
            Hincrby(cmd) => cmd.apply(db, index, dst).await,

            Ping(cmd) => cmd.apply(dst).await,
            FlushDb(cmd) => cmd.apply(db, index, dst).await,
            FlushAll(cmd) => cmd.apply(db, dst).await,
            Save(cmd) => cmd.apply(db, data_dir, dst).await,
            BgSave(cmd) => cmd.apply(db, data_dir, dst).await,
            LastSave(cmd) => cmd.apply(db, dst).await,

            Subscribe(cmd) => cmd.apply(db, dst, shutdown).await,
            PSubscribe(cmd) => cmd.apply(db, dst, shutdown).await,
            Publish(cmd) => cmd.apply(db, dst).await,
            Unsubscribe(_) => Err("ERR UNSUBSCRIBE is not valid outside of subscribe mode".into()),
            PUnsubscribe(_) => Err("ERR PUNSUBSCRIBE is not valid outside of subscribe mode".into()),

            Unknown(cmd) => cmd.apply(dst).await,

            Select(_) | Shutdown(_) | Quit(_) => {
                unreachable!("handled by the server loop before apply() is called")
            }
        }
    }

    /// Returns the command name, used for logging.
    pub(crate) fn get_name(&self) -> &str {
        match self {
            Command::Del(_) => "del",
            Command::Dump(_) => "dump",
            Command::Exists(_) => "exists",
            Command::Expire(_) => "expire",
            Command::ExpireAt(_) => "expireat",
            Command::Pexpire(_) => "pexpire",
            Command::PexpireAt(_) => "pexpireat",
            Command::Persist(_) => "persist",
            Command::TTL(_) => "ttl",
            Command::PTTL(_) => "pttl",
            Command::Keys(_) => "keys",
            Command::Move(_) => "move",
            Command::RandomKey(_) => "randomkey",
            Command::Rename(_) => "rename",
            Command::RenameNx(_) => "renamenx",
            Command::Type(_) => "type",

            Command::Get(_) => "get",
            Command::Set(_) => "set",
            Command::SetNx(_) => "setnx",
            Command::GetSet(_) => "getset",
            Command::Mget(_) => "mget",
            Command::Incr(_) => "incr",
            Command::Decr(_) => "decr",
            Command::Append(_) => "append",
            Command::Strlen(_) => "strlen",
            Command::Mset(_) => "mset",

            Command::Lpush(_) => "lpush",
            Command::Rpush(_) => "rpush",
            Command::Lpop(_) => "lpop",
            Command::Rpop(_) => "rpop",
            Command::Llen(_) => "llen",
            Command::Lrange(_) => "lrange",

            Command::Hset(_) => "hset",
            Command::Hmset(_) => "hmset",
            Command::Hget(_) => "hget",
            Command::Hdel(_) => "hdel",
            Command::Hexists(_) => "hexists",
            Command::Hgetall(_) => "hgetall",
            Command::Hkeys(_) => "hkeys",
            Command::Hvals(_) => "hvals",
            Command::Hlen(_) => "hlen",
            Command::Hmget(_) => "hmget",
            Command::Hincrby(_) => "hincrby",

            Command::Ping(_) => "ping",
            Command::Select(_) => "select",
            Command::FlushDb(_) => "flushdb",
            Command::FlushAll(_) => "flushall",
            Command::Save(_) => "save",
            Command::BgSave(_) => "bgsave",
            Command::LastSave(_) => "lastsave",
            Command::Shutdown(_) => "shutdown",
            Command::Quit(_) => "quit",

            Command::Subscribe(_) => "subscribe",
            Command::Unsubscribe(_) => "unsubscribe",
            Command::PSubscribe(_) => "psubscribe",
            Command::PUnsubscribe(_) => "punsubscribe",
            Command::Publish(_) => "publish",

            Command::Unknown(cmd) => cmd.get_name(),
        }
    }
}

/// All commands implement `new_invalid()` so a parse failure can still
/// produce a value: the command is run anyway and replies with the usual
/// "wrong number of arguments" error instead of tearing down the connection.
pub trait Invalid {
    fn new_invalid() -> Self;
}

fn transform_parse<T: Invalid>(parse_res: crate::Result<T>, parse: &mut Parse) -> T {
    match parse_res {
        Ok(cmd) => {
            if parse.check_finish() {
                cmd
            } else {
                T::new_invalid()
            }
        }
        Err(_) => T::new_invalid(),
    }
}
