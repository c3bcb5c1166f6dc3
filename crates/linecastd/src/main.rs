//! linecast relay daemon
//!
//! Accepts TCP connections, reads one handshake line from each, and
//! relays every subsequent line to all connected peers stamped with the
//! sender's name and the time it arrived.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port (8080), at most 5 peers
//! linecastd
//!
//! # Custom port and limit
//! linecastd --port 9000 --max-connections 20
//!
//! # Settings from a file, then environment, then flags
//! LINECAST_PORT=9100 linecastd --config /etc/linecast.toml
//!
//! # Enable debug logging
//! RUST_LOG=linecastd=debug linecastd
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::net::IpAddr;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use linecastd::config::ServerConfig;
use linecastd::server::RelayServer;

/// linecast relay - line-oriented TCP broadcast chat
#[derive(Parser, Debug)]
#[command(name = "linecastd", version, about)]
struct Args {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum number of concurrent connections
    #[arg(short = 'm', long)]
    max_connections: Option<usize>,

    /// Interface to bind
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    /// Layers file, environment, and flags over the defaults.
    fn load_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max) = self.max_connections {
            config.max_connections = max;
        }
        if let Some(addr) = self.bind {
            config.bind_address = addr;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.load_config().context("Failed to load configuration")?;
    run_relay(config)
}

/// Runs the relay (async entry point).
#[tokio::main]
async fn run_relay(config: ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("linecastd=info".parse()?)
                .add_directive("linecast_core=info".parse()?)
                .add_directive("linecast_protocol=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "linecast relay starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let addr = config.socket_addr();
    let server = RelayServer::bind(config, cancel_token)
        .await
        .with_context(|| format!("Failed to start relay on {addr}"))?;

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("linecast relay stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from(["linecastd", "--port", "9000", "-m", "2", "--bind", "127.0.0.1"]);
        let config = args.load_config().unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "port = 7000\nmax_connections = 3\n").unwrap();

        let args = Args::parse_from([
            "linecastd",
            "--config",
            path.to_str().unwrap(),
            "--max-connections",
            "8",
        ]);
        let config = args.load_config().unwrap();
        assert_eq!(config.max_connections, 8);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = Args::parse_from(["linecastd", "--config", "/nonexistent/linecast.toml"]);
        assert!(args.load_config().is_err());
    }
}
