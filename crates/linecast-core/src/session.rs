//! Session identity types.

use chrono::{DateTime, Utc};
use std::fmt;
use std::net::SocketAddr;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Opaque identity of one accepted connection.
///
/// Assigned by the accept loop from a monotonically increasing counter,
/// so two connections accepted by the same server never share an id.
/// This is the registry key for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw connection number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw connection number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Name a peer declared during its handshake.
///
/// Arbitrary text supplied by the peer. It is neither validated nor
/// required to be unique, and may be empty when the handshake line
/// carried no `User` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DisplayName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for DisplayName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ============================================================================
// Session View
// ============================================================================

/// Read-only snapshot of a registered session.
///
/// The registry hands these out for queries and events; the live
/// session state (its outbound queue) never leaves the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: ConnectionId,
    pub name: DisplayName,
    /// Remote address, when the transport has one.
    pub peer: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
}

impl SessionInfo {
    /// Creates a session view stamped with the current time.
    pub fn new(id: ConnectionId, name: DisplayName, peer: Option<SocketAddr>) -> Self {
        Self {
            id,
            name,
            peer,
            connected_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).get(), 7);
    }

    #[test]
    fn test_connection_ids_order_by_number() {
        assert!(ConnectionId::new(1) < ConnectionId::new(2));
    }

    #[test]
    fn test_display_name_may_be_empty() {
        let name = DisplayName::default();
        assert!(name.is_empty());
        assert_eq!(name.to_string(), "");
    }

    #[test]
    fn test_display_name_keeps_arbitrary_text() {
        let name = DisplayName::from("alice [admin]");
        assert_eq!(name.as_str(), "alice [admin]");
        assert!(!name.is_empty());
    }

    #[test]
    fn test_session_info_stamps_connect_time() {
        let before = Utc::now();
        let info = SessionInfo::new(ConnectionId::new(1), DisplayName::from("bob"), None);
        assert!(info.connected_at >= before);
        assert_eq!(info.name.as_str(), "bob");
        assert!(info.peer.is_none());
    }
}
