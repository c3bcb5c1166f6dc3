//! linecast protocol - line-oriented wire format
//!
//! Every frame on the wire is one `\n`-terminated line:
//! - the first client line is a handshake (`User=<name>`)
//! - every later client line is raw chat text
//! - every server line is a broadcast (`[<name>] [<timestamp>] - <text>`)
//!
//! The format is neither self-describing nor versioned.

pub mod broadcast;
pub mod framing;
pub mod handshake;

pub use broadcast::BroadcastLine;
pub use framing::{line_codec, DEFAULT_MAX_LINE_LENGTH};
pub use handshake::{handshake_line, Handshake, HEADER_SEPARATOR, USER_KEY};
