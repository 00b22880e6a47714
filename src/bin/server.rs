use clap::Parser;
use mapuche::config::Config;
use mapuche::server;
use socket2::{Domain, Socket, Type};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::exit;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Listen backlog for the accept queue. The spec asks for at least 5; this
/// matches what a typical `listen(2)` default would give you anyway.
const LISTEN_BACKLOG: i32 = 128;

/// Binds with `SO_REUSEADDR` set and an explicit backlog, then hands the
/// socket to Tokio. `TcpListener::bind` alone doesn't set `SO_REUSEADDR` on
/// all platforms, so a quick restart after a crash can otherwise fail with
/// `EADDRINUSE`.
fn bind_listener(addr: &str) -> mapuche::Result<TcpListener> {
    let addr: SocketAddr = addr.parse()?;
    let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };

    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(TcpListener::from_std(socket.into())?)
}

#[tokio::main]
pub async fn main() -> mapuche::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.as_deref();
    let mut config = match Config::load(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config: {err}");
            exit(1);
        }
    };

    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(log_file) = cli.log_file {
        config.log_file = Some(log_file);
    }
    if let Some(pid_file) = cli.pid_file {
        config.pid_file = Some(pid_file);
    }

    init_tracing(&config);

    if let Some(pid_file) = &config.pid_file {
        std::fs::write(pid_file, std::process::id().to_string())?;
    }

    let addr = format!("{}:{}", config.host, config.port);
    let listener = bind_listener(&addr)?;
    info!(%addr, data_dir = ?config.data_dir, "listening");

    let data_dir = config.data_dir.clone();
    server::run(listener, data_dir, shutdown_signal()).await?;

    if let Some(pid_file) = &config.pid_file {
        let _ = std::fs::remove_file(pid_file);
    }

    Ok(())
}

/// Resolves once either SIGTERM or SIGINT (ctrl-c) is received. SIGHUP is
/// handled separately below, since it asks for log rotation rather than
/// shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sig) => sig,
        Err(err) => {
            error!(%err, "failed to install SIGTERM handler");
            ctrl_c.await;
            return;
        }
    };
    let terminate = async {
        sigterm.recv().await;
    };

    spawn_sighup_logger();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// `SIGHUP` reopens the log sink in most long-running Unix daemons, so a log
/// rotation tool can move the old file aside without losing subsequent
/// output. Tracing's stdout/file writer has no live sink to reopen here, so
/// this just acknowledges the signal; a sink that supports it (e.g. a
/// rolling file appender) would be swapped in at this point.
fn spawn_sighup_logger() {
    if let Ok(mut sighup) = signal(SignalKind::hangup()) {
        tokio::spawn(async move {
            loop {
                sighup.recv().await;
                info!("received SIGHUP, rotating logs");
            }
        });
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(path) {
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(file)
                    .init();
                return;
            }
        }
        None => {}
    }

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Parser, Debug)]
#[clap(name = "mapuche-server", version, author, about = "A Redis-compatible key/value server")]
struct Cli {
    /// Address to bind to, e.g. 127.0.0.1
    #[clap(short = 'h', long = "host")]
    host: Option<String>,

    /// Port to listen on
    #[clap(short = 'p', long = "port")]
    port: Option<u16>,

    /// Directory snapshots are read from and written to
    #[clap(short = 'd', long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// File to write log output to, instead of stdout
    #[clap(short = 'l', long = "log-file")]
    log_file: Option<PathBuf>,

    /// File to write the process id to on startup
    #[clap(short = 'f', long = "pid-file")]
    pid_file: Option<PathBuf>,

    /// TOML config file layered under the flags above
    #[clap(short = 'c', long = "config")]
    config: Option<PathBuf>,
}
