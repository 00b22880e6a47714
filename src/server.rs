//! The accept loop and per-connection command dispatch.
//!
//! [`run`] binds the listener's lifetime to a `Db`, loads any existing
//! snapshot from `data_dir`, and spawns one task per inbound connection.
//! Three commands -- `SELECT`, `QUIT`, `SHUTDOWN` -- need access to
//! connection- or server-level state that [`Command::apply`] does not carry,
//! so [`Handler::run`] special-cases them before falling through to the
//! generic dispatch, the same way the per-connection loop special-cased
//! `AUTH` before this crate grew an in-memory dataset.

use crate::{Command, Connection, Db, DbDropGuard, Frame, Shutdown, SNAPSHOT_NAME};

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::time::{self, Duration};
use tracing::{debug, error, info};

/// Maximum number of concurrent connections the server will accept.
///
/// A real deployment would make this configurable; we pick a generous fixed
/// limit so a runaway client can't exhaust file descriptors.
const MAX_CONNECTIONS: usize = 250;

/// Server listener state. Created in the `run` call. It includes a `run`
/// method which performs the TCP listening and initialization of per
/// connection state.
#[derive(Debug)]
struct Listener {
    /// Shared database handle, loaded from `data_dir`'s snapshot if one
    /// exists.
    db_holder: DbDropGuard,

    /// Directory snapshots are written to and loaded from.
    data_dir: PathBuf,

    /// TCP listener supplied by the `run` caller.
    listener: TcpListener,

    limit_connections: Arc<Semaphore>,

    /// Broadcasts a shutdown signal to all active connections, and to the
    /// accept loop below: a `SHUTDOWN` command received on any one
    /// connection sends on this to bring the whole server down, not just
    /// that connection.
    notify_shutdown: broadcast::Sender<()>,

    /// Held alongside `notify_shutdown` so the accept loop can listen for
    /// the same signal it broadcasts to handlers.
    shutdown_rx: broadcast::Receiver<()>,

    /// Used as part of the graceful shutdown process to wait for client
    /// connections to complete processing.
    shutdown_complete_rx: mpsc::Receiver<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
}

/// Per-connection handler. Reads requests from `connection` and applies the
/// commands to `db`.
#[derive(Debug)]
struct Handler {
    db: Db,

    /// The database this connection currently has selected. Starts at `0`
    /// and is mutated in place by `SELECT`; it never moves any values, only
    /// the connection's own pointer into the keyspace.
    db_index: usize,

    data_dir: PathBuf,

    connection: Connection,

    shutdown: Shutdown,

    /// Clone of the listener's sender, used only to turn a `SHUTDOWN`
    /// command received on this connection into a signal that brings down
    /// the whole server, not just this connection.
    notify_shutdown: broadcast::Sender<()>,

    /// Not used directly by `Handler`, but holding it is what makes the
    /// graceful shutdown protocol work: the listener's `shutdown_complete_rx`
    /// only resolves once every handler's clone of this sender has been
    /// dropped.
    _shutdown_complete: mpsc::Sender<()>,
}

/// Run the mapuche server.
///
/// Loads an existing snapshot from `data_dir` (if any), then accepts
/// connections from the supplied listener, spawning one task per inbound
/// connection. The server runs until the `shutdown` future completes, at
/// which point it writes a final snapshot and shuts down gracefully.
///
/// `tokio::signal::ctrl_c()` can be used as the `shutdown` argument.
///
/// Returns `Err` if the snapshot in `data_dir` exists but is corrupt or from
/// an incompatible version: that is treated as fatal rather than silently
/// starting from an empty dataset, since it would otherwise throw away
/// whatever's on disk the next time a snapshot is written.
pub async fn run(
    listener: TcpListener,
    data_dir: PathBuf,
    shutdown: impl Future,
) -> crate::Result<()> {
    let (notify_shutdown, _) = broadcast::channel(1);
    let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);
    let db_holder = DbDropGuard::new();

    match crate::snapshot::load(&data_dir, SNAPSHOT_NAME)? {
        Some((dbs, _)) => db_holder.db().restore(dbs),
        None => info!("no snapshot found, starting with an empty dataset"),
    }

    let mut server = Listener {
        db_holder: db_holder.clone(),
        data_dir: data_dir.clone(),
        listener,
        limit_connections: Arc::new(Semaphore::new(MAX_CONNECTIONS)),
        shutdown_rx: notify_shutdown.subscribe(),
        notify_shutdown,
        shutdown_complete_tx,
        shutdown_complete_rx,
    };

    tokio::select! {
        res = server.run() => {
            // If an error is received here, accepting connections from the TCP
            // listener failed multiple times and the server is giving up and
            // shutting down.
            if let Err(err) = res {
                error!(%err, "failed to accept");
            }
        }
        _ = shutdown => {
            info!("shutting down");
        }
    }

    let Listener {
        mut shutdown_complete_rx,
        shutdown_complete_tx,
        notify_shutdown,
        db_holder,
        data_dir,
        ..
    } = server;

    // When `notify_shutdown` is dropped, all tasks which have `subscribe`d
    // will receive the shutdown signal and can exit.
    drop(notify_shutdown);
    // Drop the final `Sender` so the `Receiver` below can complete.
    drop(shutdown_complete_tx);

    // Wait for all active connections to finish processing.
    let _ = shutdown_complete_rx.recv().await;

    write_final_snapshot(&db_holder.db(), &data_dir);

    Ok(())
}

fn write_final_snapshot(db: &Db, data_dir: &std::path::Path) {
    let (databases, saved_at_ms) = db.snapshot();
    match crate::snapshot::save(data_dir, SNAPSHOT_NAME, &databases, saved_at_ms) {
        Ok(()) => info!("wrote final snapshot"),
        Err(err) => error!(%err, "failed to write final snapshot"),
    }
}

impl Listener {
    /// Run the server.
    ///
    /// Listen for inbound connections. For each inbound connection, spawn a
    /// task to process that connection.
    ///
    /// # Errors
    ///
    /// Returns `Err` if accepting returns an error. This can happen for a
    /// number of reasons that resolve over time, such as the OS reaching an
    /// internal limit on open sockets. There's no way to detect when a
    /// transient error resolves itself, so an exponential backoff is used.
    async fn run(&mut self) -> crate::Result<()> {
        info!("accepting inbound connections");

        loop {
            let permit = self
                .limit_connections
                .clone()
                .acquire_owned()
                .await
                .unwrap();

            let socket = tokio::select! {
                res = self.accept() => res?,
                _ = self.shutdown_rx.recv() => return Ok(()),
            };

            let mut handler = Handler {
                db: self.db_holder.db(),
                db_index: 0,
                data_dir: self.data_dir.clone(),
                connection: Connection::new(socket),
                shutdown: Shutdown::new(self.notify_shutdown.subscribe()),
                notify_shutdown: self.notify_shutdown.clone(),
                _shutdown_complete: self.shutdown_complete_tx.clone(),
            };

            tokio::spawn(async move {
                if let Err(err) = handler.run().await {
                    error!(cause = %err, "connection error");
                }
                drop(permit);
            });
        }
    }

    /// Accept an inbound connection.
    ///
    /// Errors are handled by backing off and retrying. An exponential
    /// backoff strategy is used. After the first failure, the task waits for
    /// 1 second. After the second failure, the task waits for 2 seconds.
    /// Each subsequent failure doubles the wait time. If accepting fails on
    /// the 6th try after waiting for 64 seconds, this function returns with
    /// an error.
    async fn accept(&mut self) -> crate::Result<TcpStream> {
        let mut backoff = 1;

        loop {
            match self.listener.accept().await {
                Ok((socket, _)) => return Ok(socket),
                Err(err) => {
                    if backoff > 64 {
                        return Err(err.into());
                    }
                }
            }

            time::sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }
}

impl Handler {
    /// Process a single connection.
    ///
    /// Request frames are read from the socket and processed. Responses are
    /// written back to the socket.
    ///
    /// Pipelining is not implemented: each request is fully answered before
    /// the next is read.
    ///
    /// When the shutdown signal is received, the connection is processed
    /// until it reaches a safe state, at which point it is terminated.
    async fn run(&mut self) -> crate::Result<()> {
        while !self.shutdown.is_shutdown() {
            let maybe_frame = tokio::select! {
                res = self.connection.read_frame() => res?,
                _ = self.shutdown.recv() => {
                    return Ok(());
                }
            };

            let frame = match maybe_frame {
                Some(frame) => frame,
                None => return Ok(()),
            };

            let cmd = Command::from_frame(frame)?;
            debug!(?cmd);

            match cmd {
                Command::Select(cmd) => {
                    cmd.apply(&mut self.db_index, &mut self.connection).await?;
                }
                Command::Quit(cmd) => {
                    cmd.apply(&mut self.connection).await?;
                    return Ok(());
                }
                Command::Shutdown(cmd) => {
                    if !cmd.valid() {
                        let response = Frame::Error("ERR syntax error".to_string());
                        self.connection.write_frame(&response).await?;
                        continue;
                    }
                    if cmd.save() {
                        write_final_snapshot(&self.db, &self.data_dir);
                    }
                    let _ = self.notify_shutdown.send(());
                    return Ok(());
                }
                cmd => {
                    cmd.apply(
                        &self.db,
                        self.db_index,
                        &self.data_dir,
                        &mut self.connection,
                        &mut self.shutdown,
                    )
                    .await?;
                }
            }
        }

        Ok(())
    }
}
