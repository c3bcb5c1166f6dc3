//! Handshake line parsing.
//!
//! The first line a client sends declares its identity, e.g. `User=bob`.
//! The line is split on `=` and the tokens are read as alternating
//! key, value, key, value. Only a single pair is meaningful in practice:
//! `User=a=b` yields `User -> a` plus a dangling key `b`, and
//! `a=User=b` yields `a -> User` with no `User` key at all. That mapping
//! is kept as-is so existing clients see unchanged behavior.

use std::collections::HashMap;

use linecast_core::DisplayName;

/// Key carrying the peer's display name.
pub const USER_KEY: &str = "User";

/// Separator between handshake tokens.
pub const HEADER_SEPARATOR: char = '=';

/// Parsed handshake headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    headers: HashMap<String, String>,
}

impl Handshake {
    /// Parses a handshake line. Never fails: a line without any
    /// key/value pair simply yields no headers.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n');

        let mut headers = HashMap::new();
        let mut key = "";
        for (index, token) in line.split(HEADER_SEPARATOR).enumerate() {
            if index % 2 == 0 {
                key = token;
            } else {
                headers.insert(key.to_string(), token.to_string());
            }
        }

        Self { headers }
    }

    /// Looks up a header value.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Display name from the `User` header, empty when absent.
    pub fn user(&self) -> DisplayName {
        self.header(USER_KEY)
            .map(DisplayName::from)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Renders the handshake line a client sends for `user`, newline included.
pub fn handshake_line(user: &str) -> String {
    format!("{USER_KEY}{HEADER_SEPARATOR}{user}\n")
}
