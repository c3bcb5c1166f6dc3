//! linecast - terminal client for the linecast relay
//!
//! # Usage
//!
//! ```text
//! linecast --user alice                     # localhost:8080
//! linecast --user bob --host chat.lan -p 9000
//! ```
//!
//! Every line typed is sent to the relay; every line the relay sends is
//! printed behind `Message from server: `. Logs go to stderr
//! (`RUST_LOG=linecast_client=debug` for more).

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use linecast_client::{ChatClient, ClientConfig, ClientError, SessionEnd};

/// linecast - line-oriented TCP chat client
#[derive(Parser, Debug)]
#[command(name = "linecast", version, about)]
struct Args {
    /// The username you wish to use
    #[arg(short, long)]
    user: String,

    /// Relay host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Relay port
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            user: args.user,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("linecast_client=warn".parse()?),
        )
        .init();

    let config = ClientConfig::from(Args::parse());

    let client = match ChatClient::connect(&config).await {
        Ok(client) => client,
        Err(ClientError::MissingUser) => {
            println!("{}", ClientError::MissingUser);
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    println!("Connected to chat server. Type your messages:");

    if client.run().await? == SessionEnd::ServerClosed {
        warn!("Connection closed by relay");
    }
    Ok(())
}
