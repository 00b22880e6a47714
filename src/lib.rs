//! An in-memory, Redis-protocol-compatible key/value server.
//!
//! The modules here mirror the shape of a small Redis clone: a RESP
//! [`Frame`] codec, a `Parse` cursor for turning a frame into a typed
//! command, a [`Connection`] wrapping buffered socket I/O, a [`Db`] holding
//! the numbered keyspaces plus expirations and pub/sub routing, and a
//! [`cmd::Command`] enum dispatched by the [`server`].

pub mod cmd;
pub use cmd::Command;

mod connection;
pub use connection::Connection;

pub mod frame;
pub use frame::Frame;

pub mod config;

mod db;
pub use db::{Db, DbDropGuard};

mod glob;

mod parse;
use parse::{Parse, ParseError};

pub mod snapshot;

pub mod server;

mod shutdown;
use shutdown::Shutdown;

pub mod utils;

/// Default port that the server listens on.
pub const DEFAULT_PORT: u16 = 6379;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Name of the aggregate snapshot file under the data directory.
pub const SNAPSHOT_NAME: &str = "redisdb";

/// Error returned by most functions.
///
/// When writing a real application, one might want to consider a specialized
/// error handling crate or defining an error type as an `enum` of causes.
/// However, for our example, using a boxed `std::error::Error` is sufficient.
///
/// For performance reasons, boxing is avoided in any hot path. For example, in
/// `parse`, a custom error `enum` is defined. This is because the error is hit
/// and handled during normal execution when a partial frame is received on a
/// socket. `std::error::Error` is implemented for `parse::Error` which allows
/// it to be converted to `Box<dyn std::error::Error>`.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for mapuche operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors a command handler needs to distinguish, as opposed to the
/// generic, connection-fatal errors that simply propagate as `Error`.
#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("value is not an integer or out of range")]
    NotAnInteger,
}
