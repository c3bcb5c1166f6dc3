//! Registry actor commands, errors, and events.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `SessionEvent`: Events published by the registry for observers
//! - `FanOutReport`: Outcome of delivering one line to every session

use std::sync::Arc;

use linecast_core::{ConnectionId, SessionInfo};
use thiserror::Error;
use tokio::sync::oneshot;

use super::session::{Backlogged, Session};

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Each command uses a oneshot channel for the response. The actor
/// handles commands one at a time, so a `FanOut` always sees the
/// registry as it stands between two mutations.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Insert a session after a successful handshake.
    ///
    /// # Errors
    /// - `RegistryError::AlreadyRegistered` if the connection id is taken
    Register {
        /// The session to insert (boxed to keep the enum small)
        session: Box<Session>,
        /// Channel to send the result
        respond_to: oneshot::Sender<Result<(), RegistryError>>,
    },

    /// Remove a session during teardown.
    ///
    /// # Errors
    /// - `RegistryError::NotFound` if no session has this id
    Remove {
        /// ID of the session to remove
        id: ConnectionId,
        /// Channel to send the removed session's view
        respond_to: oneshot::Sender<Result<SessionInfo, RegistryError>>,
    },

    /// Queue one rendered line on every registered session.
    FanOut {
        /// The rendered line, shared by all recipients
        line: Arc<str>,
        /// Channel to send the delivery report
        respond_to: oneshot::Sender<FanOutReport>,
    },

    /// Get a single session by ID.
    GetSession {
        /// ID of the session to retrieve
        id: ConnectionId,
        /// Channel to send the result
        respond_to: oneshot::Sender<Option<SessionInfo>>,
    },

    /// Get all sessions, ordered by connection id.
    GetAllSessions {
        /// Channel to send the results
        respond_to: oneshot::Sender<Vec<SessionInfo>>,
    },

    /// Number of registered sessions.
    Count {
        /// Channel to send the count
        respond_to: oneshot::Sender<usize>,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A session with this connection id is already registered.
    #[error("session already registered: {0}")]
    AlreadyRegistered(ConnectionId),

    /// No session with this connection id is registered.
    #[error("session not found: {0}")]
    NotFound(ConnectionId),

    /// The actor stopped before answering.
    #[error("registry channel closed")]
    ChannelClosed,
}

// ============================================================================
// Session Events
// ============================================================================

/// Events published by the registry.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session completed its handshake and was registered.
    Joined { info: SessionInfo },

    /// A session was removed during teardown.
    Left { info: SessionInfo },
}

impl SessionEvent {
    pub fn info(&self) -> &SessionInfo {
        match self {
            SessionEvent::Joined { info } | SessionEvent::Left { info } => info,
        }
    }
}

// ============================================================================
// Fan-out Report
// ============================================================================

/// Outcome of a single fan-out pass.
///
/// Recipients whose queue was full are handed back in `backlogged`
/// rather than skipped; the broadcaster finishes those deliveries
/// outside the actor.
#[derive(Debug, Clone, Default)]
pub struct FanOutReport {
    /// Sessions registered when the pass ran.
    pub recipients: usize,
    /// Lines queued for writing.
    pub delivered: usize,
    /// Recipients whose writer had already stopped.
    pub closed: usize,
    /// Recipients disconnected for not making room in time.
    pub disconnected: usize,
    /// Recipients still waiting for this line.
    pub backlogged: Vec<Backlogged>,
}

impl FanOutReport {
    /// True when every recipient got the line queued.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.delivered == self.recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linecast_core::DisplayName;

    #[test]
    fn test_error_display() {
        let err = RegistryError::NotFound(ConnectionId::new(4));
        assert_eq!(err.to_string(), "session not found: conn-4");
    }

    #[test]
    fn test_event_info() {
        let info = SessionInfo::new(ConnectionId::new(1), DisplayName::from("eve"), None);
        let event = SessionEvent::Left { info: info.clone() };
        assert_eq!(event.info(), &info);
    }

    #[test]
    fn test_report_completeness() {
        let report = FanOutReport {
            recipients: 3,
            delivered: 2,
            disconnected: 1,
            ..Default::default()
        };
        assert!(!report.is_complete());
        assert!(FanOutReport::default().is_complete());
    }
}
