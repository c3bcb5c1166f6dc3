//! linecast client - library modules
//!
//! A minimal terminal client for the relay: it connects, announces a
//! display name with the handshake line, then copies input lines to the
//! server and server lines to the output until either side closes.
//!
//! ```text
//!   stdin ──lines──▶ ChatClient ──TCP──▶ linecastd
//!   stdout ◀── "Message from server: …" ◀──┘
//! ```

pub mod client;
pub mod error;

// Re-export commonly used types
pub use client::{ChatClient, ClientConfig, SessionEnd, SERVER_PREFIX};
pub use error::{ClientError, Result};
