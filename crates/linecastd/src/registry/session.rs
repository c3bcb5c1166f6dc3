//! Registered session state.

use std::sync::Arc;
use std::time::Duration;

use linecast_core::{ConnectionId, DisplayName, SessionInfo};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Sender half of a session's outbound queue.
pub type OutboundSender = mpsc::Sender<Arc<str>>;

/// A connected, handshake-completed peer.
///
/// Owned by the registry for its whole lifetime. The socket itself
/// stays with the session's writer task; the registry holds the sending
/// side of that writer's bounded queue and the session's cancellation
/// token. Cancelling the token ends the read loop and the writer.
#[derive(Debug)]
pub struct Session {
    info: SessionInfo,
    outbound: OutboundSender,
    cancel_token: CancellationToken,
}

/// Result of queueing a line on one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The writer is behind; the line has not been queued yet.
    QueueFull,
    /// The writer has already stopped.
    Closed,
    /// No room appeared in time; the session was cancelled.
    TimedOut,
}

impl Session {
    pub fn new(info: SessionInfo, outbound: OutboundSender, cancel_token: CancellationToken) -> Self {
        Self {
            info,
            outbound,
            cancel_token,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.info.id
    }

    pub fn name(&self) -> &DisplayName {
        &self.info.name
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn into_info(self) -> SessionInfo {
        self.info
    }

    /// Queues a line without waiting.
    pub fn deliver(&self, line: Arc<str>) -> Delivery {
        match self.outbound.try_send(line) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::QueueFull,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Handle for finishing a delivery outside the registry.
    pub fn backlog(&self) -> Backlogged {
        Backlogged {
            id: self.id(),
            outbound: self.outbound.clone(),
            cancel_token: self.cancel_token.clone(),
        }
    }

    /// Stops the session's read loop and writer.
    pub fn disconnect(&self) {
        self.cancel_token.cancel();
    }
}

/// A recipient whose queue was full during a fan-out pass.
#[derive(Debug, Clone)]
pub struct Backlogged {
    id: ConnectionId,
    outbound: OutboundSender,
    cancel_token: CancellationToken,
}

impl Backlogged {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Waits up to `limit` for room in the queue.
    ///
    /// A peer that does not make room in time is cancelled and goes
    /// through its normal teardown. A session that is cancelled while
    /// waiting (removed, or shutting down) gets nothing.
    pub async fn deliver(self, line: Arc<str>, limit: Duration) -> Delivery {
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => Delivery::Closed,
            sent = self.outbound.send_timeout(line, limit) => match sent {
                Ok(()) => Delivery::Queued,
                Err(SendTimeoutError::Timeout(_)) => {
                    warn!(
                        conn = %self.id,
                        timeout = ?limit,
                        "Outbound queue stayed full, disconnecting slow peer"
                    );
                    self.cancel_token.cancel();
                    Delivery::TimedOut
                }
                Err(SendTimeoutError::Closed(_)) => Delivery::Closed,
            },
        }
    }
}
