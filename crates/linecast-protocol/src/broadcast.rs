//! Parsing of server broadcast lines.

use chrono::{DateTime, Utc};
use linecast_core::parse_rfc1123;

const TIMESTAMP_OPEN: &str = "] [";
const TEXT_OPEN: &str = "] - ";

/// A broadcast line split into its parts.
///
/// Borrowed from the input line. The sender is everything up to the
/// first `] [`, so a name containing that sequence will not split
/// cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastLine<'a> {
    pub sender: &'a str,
    pub timestamp: &'a str,
    pub text: &'a str,
}

impl<'a> BroadcastLine<'a> {
    /// Splits `[<name>] [<timestamp>] - <text>`, with or without the
    /// trailing newline. Returns `None` for anything else.
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line);

        let rest = line.strip_prefix('[')?;
        let (sender, rest) = rest.split_once(TIMESTAMP_OPEN)?;
        let (timestamp, text) = rest.split_once(TEXT_OPEN)?;

        Some(Self {
            sender,
            timestamp,
            text,
        })
    }

    /// The timestamp as a UTC instant, if it is well formed.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        parse_rfc1123(self.timestamp)
    }
}
