//! Registry actor - owns all session state and processes commands.
//!
//! The RegistryActor is the single owner of session state in the system.
//! It receives commands via an mpsc channel and publishes events via broadcast.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel send failures are logged but don't panic

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use linecast_core::{ConnectionId, SessionInfo};

use super::commands::{FanOutReport, RegistryCommand, RegistryError, SessionEvent};
use super::session::{Delivery, Session};

/// The registry actor - owns all session state.
///
/// Implements the actor pattern: receives commands via mpsc channel,
/// processes them sequentially, and publishes events to subscribers.
///
/// # Consistency
///
/// Inserts (from handshakes), removals (from read loops) and fan-out
/// passes (from the broadcaster) are all commands on the same channel.
/// A fan-out therefore never observes a half-applied mutation: every
/// session present when the pass starts gets the line queued or handed
/// back as backlogged, and a session removed before the pass is never
/// offered it. Removal cancels the session, so a backlogged delivery
/// racing a removal gives up.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Active sessions keyed by connection
    sessions: HashMap<ConnectionId, Session>,

    /// Event publisher for joins and leaves
    event_publisher: broadcast::Sender<SessionEvent>,
}

impl RegistryActor {
    /// Creates a new registry actor.
    ///
    /// # Arguments
    ///
    /// * `receiver` - Channel for receiving commands
    /// * `event_publisher` - Broadcast channel for publishing events
    pub fn new(
        receiver: mpsc::Receiver<RegistryCommand>,
        event_publisher: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            receiver,
            sessions: HashMap::new(),
            event_publisher,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    /// This is the main entry point - call this in a spawned task.
    pub async fn run(mut self) {
        debug!("Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        debug!(sessions = self.sessions.len(), "Registry actor stopped");
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register {
                session,
                respond_to,
            } => {
                let result = self.handle_register(*session);
                // Ignore send error - caller may have given up waiting
                let _ = respond_to.send(result);
            }
            RegistryCommand::Remove { id, respond_to } => {
                let result = self.handle_remove(id);
                let _ = respond_to.send(result);
            }
            RegistryCommand::FanOut { line, respond_to } => {
                let report = self.handle_fan_out(line);
                let _ = respond_to.send(report);
            }
            RegistryCommand::GetSession { id, respond_to } => {
                let result = self.sessions.get(&id).map(|s| s.info().clone());
                let _ = respond_to.send(result);
            }
            RegistryCommand::GetAllSessions { respond_to } => {
                let _ = respond_to.send(self.handle_get_all_sessions());
            }
            RegistryCommand::Count { respond_to } => {
                let _ = respond_to.send(self.sessions.len());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_register(&mut self, session: Session) -> Result<(), RegistryError> {
        let id = session.id();
        if self.sessions.contains_key(&id) {
            warn!(conn = %id, "Session already registered, rejecting");
            return Err(RegistryError::AlreadyRegistered(id));
        }

        let info = session.info().clone();
        self.sessions.insert(id, session);

        info!(
            conn = %id,
            user = %info.name,
            total_sessions = self.sessions.len(),
            "Session registered"
        );

        // Publish event (ignore if no subscribers)
        let _ = self.event_publisher.send(SessionEvent::Joined { info });
        Ok(())
    }

    fn handle_remove(&mut self, id: ConnectionId) -> Result<SessionInfo, RegistryError> {
        let session = self
            .sessions
            .remove(&id)
            .ok_or(RegistryError::NotFound(id))?;
        session.disconnect();
        let info = session.into_info();

        info!(
            conn = %id,
            user = %info.name,
            total_sessions = self.sessions.len(),
            "Session removed"
        );

        let _ = self
            .event_publisher
            .send(SessionEvent::Left { info: info.clone() });
        Ok(info)
    }

    fn handle_fan_out(&mut self, line: Arc<str>) -> FanOutReport {
        let mut report = FanOutReport {
            recipients: self.sessions.len(),
            ..Default::default()
        };

        for session in self.sessions.values() {
            match session.deliver(Arc::clone(&line)) {
                Delivery::Queued => report.delivered += 1,
                Delivery::QueueFull => {
                    debug!(
                        conn = %session.id(),
                        user = %session.name(),
                        "Outbound queue full, deferring line"
                    );
                    report.backlogged.push(session.backlog());
                }
                Delivery::Closed | Delivery::TimedOut => {
                    debug!(conn = %session.id(), "Writer already stopped, skipping");
                    report.closed += 1;
                }
            }
        }

        report
    }

    fn handle_get_all_sessions(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> =
            self.sessions.values().map(|s| s.info().clone()).collect();
        sessions.sort_by_key(|info| info.id);
        sessions
    }
}
