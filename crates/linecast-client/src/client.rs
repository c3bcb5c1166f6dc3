//! Relay connection for the linecast client.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use tokio::io::{
    stdin, stdout, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tracing::{debug, info};

use linecast_protocol::handshake_line;

use crate::error::{ClientError, Result};

/// Printed before every line received from the relay.
pub const SERVER_PREFIX: &str = "Message from server: ";

// ============================================================================
// Configuration
// ============================================================================

/// Where to connect and who to be.
///
/// # Example
///
/// ```rust
/// use linecast_client::ClientConfig;
///
/// let config = ClientConfig {
///     port: 9000,
///     ..ClientConfig::new("alice")
/// };
/// assert_eq!(config.address(), "localhost:9000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Relay host name or address.
    pub host: String,

    /// Relay port.
    pub port: u16,

    /// Display name sent in the handshake.
    pub user: String,
}

impl ClientConfig {
    /// Default host and port with the given display name.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            user: user.into(),
        }
    }

    /// The `host:port` string that will be dialed.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Chat Client
// ============================================================================

/// How a client session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The input reached end of file.
    InputClosed,
    /// The relay closed the connection.
    ServerClosed,
}

/// A connected, handshaken client.
pub struct ChatClient {
    stream: TcpStream,
    user: String,
}

impl ChatClient {
    /// Connects to the relay and sends the handshake line.
    ///
    /// # Errors
    ///
    /// - `ClientError::MissingUser` if `config.user` is empty
    /// - `ClientError::Connect` if the relay cannot be reached
    /// - `ClientError::Handshake` if the handshake cannot be written
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        if config.user.is_empty() {
            return Err(ClientError::MissingUser);
        }

        let addr = config.address();
        let mut stream = TcpStream::connect(addr.as_str())
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.clone(),
                source,
            })?;

        stream
            .write_all(handshake_line(&config.user).as_bytes())
            .await
            .map_err(ClientError::Handshake)?;

        info!(addr = %addr, user = %config.user, "Connected to relay");

        Ok(Self {
            stream,
            user: config.user.clone(),
        })
    }

    /// Relays between the terminal and the server.
    pub async fn run(self) -> Result<SessionEnd> {
        self.run_with(BufReader::new(stdin()), stdout()).await
    }

    /// Relays between `input`/`output` and the server.
    ///
    /// Each input line is sent as one chat line. Each server line is
    /// written to `output` behind [`SERVER_PREFIX`]. Returns when either
    /// the input or the connection reaches end of file.
    ///
    /// # Errors
    ///
    /// `ClientError::Io` if reading or writing either side fails.
    pub async fn run_with<I, O>(self, input: I, mut output: O) -> Result<SessionEnd>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let (read_half, mut write_half) = self.stream.into_split();
        let mut server_lines = BufReader::new(read_half).lines();
        let mut input_lines = input.lines();

        loop {
            tokio::select! {
                line = input_lines.next_line() => match line? {
                    Some(line) => {
                        write_half.write_all(line.as_bytes()).await?;
                        write_half.write_all(b"\n").await?;
                    }
                    None => {
                        debug!(user = %self.user, "Input closed");
                        let _ = write_half.shutdown().await;
                        return Ok(SessionEnd::InputClosed);
                    }
                },

                line = server_lines.next_line() => match line? {
                    Some(line) => {
                        output
                            .write_all(format!("{SERVER_PREFIX}{line}\n").as_bytes())
                            .await?;
                        output.flush().await?;
                    }
                    None => {
                        info!(user = %self.user, "Relay closed the connection");
                        return Ok(SessionEnd::ServerClosed);
                    }
                },
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("bob");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8080);
        assert_eq!(config.address(), "localhost:8080");
    }

    #[tokio::test]
    async fn test_connect_requires_user() {
        let result = ChatClient::connect(&ClientConfig::new("")).await;
        assert!(matches!(result, Err(ClientError::MissingUser)));
    }
}
