//! linecast core - shared types for the broadcast relay
//!
//! This crate provides the domain types shared between
//! the relay daemon (linecastd) and the reference client.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod message;
pub mod session;

// Re-exports for convenience
pub use message::{format_rfc1123, parse_rfc1123, OutboundMessage, RFC1123_FORMAT};
pub use session::{ConnectionId, DisplayName, SessionInfo};
