//! Error types for the linecast client.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use thiserror::Error;

// ============================================================================
// Client Error Type
// ============================================================================

/// Client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No display name was given.
    ///
    /// The relay accepts an empty name, but the client refuses to start
    /// without one so every line it sends is attributable.
    #[error("You must specify a username.")]
    MissingUser,

    /// Failed to open the TCP connection.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        /// The `host:port` that was dialed.
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Connected, but the handshake line could not be sent.
    #[error("Failed to send handshake: {0}")]
    Handshake(#[source] io::Error),

    /// I/O error passthrough.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Convenience Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

// ============================================================================
// Tests
// ============================================================================
