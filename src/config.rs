//! Layered configuration: built-in defaults, an optional TOML file, and CLI
//! flags, in that order of increasing precedence.

use crate::{DEFAULT_HOST, DEFAULT_PORT};

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Resolved server configuration, after CLI flags have been layered over an
/// optional config file over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub pid_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("./mapuche_data"),
            log_file: None,
            pid_file: None,
        }
    }
}

/// Shape of an optional TOML config file, every field optional so a file can
/// override as little or as much of the defaults as it likes.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<String>,
    log_file: Option<String>,
    pid_file: Option<String>,
}

impl Config {
    /// Starts from the built-in defaults and layers `path`'s contents on
    /// top, if it exists. A missing file is not an error: it just means the
    /// defaults (and later, CLI flags) stand on their own.
    pub fn load(path: Option<&Path>) -> crate::Result<Config> {
        let mut config = Config::default();

        let Some(path) = path else {
            return Ok(config);
        };
        if !path.exists() {
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&contents)?;

        if let Some(host) = file.host {
            config.host = host;
        }
        if let Some(port) = file.port {
            config.port = port;
        }
        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(log_file) = file.log_file {
            config.log_file = Some(PathBuf::from(log_file));
        }
        if let Some(pid_file) = file.pid_file {
            config.pid_file = Some(PathBuf::from(pid_file));
        }

        Ok(config)
    }
}
