//! Server configuration.
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults (`ServerConfig::default()`)
//! 2. An optional TOML file (`ServerConfig::from_file`)
//! 3. Environment variables (`ServerConfig::apply_env`)
//! 4. Command-line flags (applied by the binary)
//!
//! The configuration is read once at startup and never changes afterwards.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use linecast_protocol::DEFAULT_MAX_LINE_LENGTH;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Default maximum number of concurrent connections
pub const DEFAULT_MAX_CONNECTIONS: usize = 5;

/// Lines a single session may have waiting before the broadcaster blocks on it
pub const DEFAULT_OUTBOUND_QUEUE: usize = 64;

/// Chat lines waiting for the broadcaster before readers back off
pub const DEFAULT_BROADCAST_QUEUE: usize = 256;

/// Time a new connection gets to send its handshake line
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Time a single write, or a wait for queue room, may take before the peer
/// is considered unresponsive
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable overriding the listening port
pub const PORT_ENV: &str = "LINECAST_PORT";

/// Environment variable overriding the connection limit
pub const MAX_CONNECTIONS_ENV: &str = "LINECAST_MAX_CONNECTIONS";

/// Runtime configuration for [`RelayServer`](crate::server::RelayServer).
///
/// # Example
///
/// ```rust
/// use linecastd::config::ServerConfig;
///
/// let config = ServerConfig {
///     port: 9000,
///     max_connections: 2,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to listen on (all interfaces by default).
    pub bind_address: IpAddr,

    /// Port to listen on. `0` picks an ephemeral port.
    pub port: u16,

    /// Capacity of the admission slot pool.
    pub max_connections: usize,

    /// Longest accepted line, terminator excluded.
    pub max_line_length: usize,

    /// Per-session outbound queue capacity.
    pub outbound_queue: usize,

    /// Broadcaster queue capacity.
    pub broadcast_queue: usize,

    /// Deadline for the handshake line.
    pub handshake_timeout: Duration,

    /// Deadline for a single write to a peer.
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            broadcast_queue: DEFAULT_BROADCAST_QUEUE,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// On-disk representation. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    bind_address: Option<IpAddr>,
    port: Option<u16>,
    max_connections: Option<usize>,
    max_line_length: Option<usize>,
    outbound_queue: Option<usize>,
    broadcast_queue: Option<usize>,
    handshake_timeout_secs: Option<u64>,
    write_timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Loads a TOML file on top of the defaults.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Read` if the file cannot be read
    /// - `ConfigError::Parse` if it is not valid TOML or has unknown keys
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let file: FileConfig = toml::from_str(contents)?;
        let mut config = Self::default();
        config.apply_file(file);
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(addr) = file.bind_address {
            self.bind_address = addr;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(max) = file.max_connections {
            self.max_connections = max;
        }
        if let Some(len) = file.max_line_length {
            self.max_line_length = len;
        }
        if let Some(cap) = file.outbound_queue {
            self.outbound_queue = cap;
        }
        if let Some(cap) = file.broadcast_queue {
            self.broadcast_queue = cap;
        }
        if let Some(secs) = file.handshake_timeout_secs {
            self.handshake_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.write_timeout_secs {
            self.write_timeout = Duration::from_secs(secs);
        }
    }

    /// Applies `LINECAST_PORT` and `LINECAST_MAX_CONNECTIONS`.
    ///
    /// `lookup` is normally `|key| std::env::var(key).ok()`.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidEnv` if a variable is set but does not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(PORT_ENV) {
            self.port = parse_env(PORT_ENV, &value)?;
        }
        if let Some(value) = lookup(MAX_CONNECTIONS_ENV) {
            self.max_connections = parse_env(MAX_CONNECTIONS_ENV, &value)?;
        }
        Ok(())
    }

    /// Checks that every limit is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::ZeroLimit("max_connections"));
        }
        if self.max_line_length == 0 {
            return Err(ConfigError::ZeroLimit("max_line_length"));
        }
        if self.outbound_queue == 0 {
            return Err(ConfigError::ZeroLimit("outbound_queue"));
        }
        if self.broadcast_queue == 0 {
            return Err(ConfigError::ZeroLimit("broadcast_queue"));
        }
        if self.handshake_timeout.is_zero() {
            return Err(ConfigError::ZeroLimit("handshake_timeout"));
        }
        if self.write_timeout.is_zero() {
            return Err(ConfigError::ZeroLimit("write_timeout"));
        }
        Ok(())
    }

    /// Address the listener binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

/// Errors that can occur while assembling the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}
