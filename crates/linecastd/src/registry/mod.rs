//! Session registry using Actor pattern.
//!
//! The registry is the single shared mutable resource of the relay: the
//! map from connection id to live session. It receives commands via a
//! tokio mpsc channel and is the only place that map is touched.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  Register/Remove  ┌─────────────────┐     ┌──────────────────┐
//! │  SessionTask    │──────────────────▶│  RegistryActor  │────▶│ Broadcast Channel│
//! └─────────────────┘                   └────────▲────────┘     └──────────────────┘
//!                                                │ FanOut                │
//! ┌─────────────────┐                            │                       │ SessionEvent
//! │  Broadcaster    │────────────────────────────┘                       ▼
//! └─────────────────┘                                            observers / tests
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use tokio::sync::{broadcast, mpsc};

mod actor;
mod commands;
mod handle;
mod session;

pub use actor::RegistryActor;
pub use commands::{FanOutReport, RegistryCommand, RegistryError, SessionEvent};
pub use handle::RegistryHandle;
pub use session::{Backlogged, Delivery, OutboundSender, Session};

/// Channel buffer sizes
const COMMAND_BUFFER: usize = 100;
const EVENT_BUFFER: usize = 100;

/// Spawn the registry actor and return a handle for interaction.
///
/// The actor stops once every handle has been dropped.
///
/// # Example
///
/// ```no_run
/// use linecastd::registry::spawn_registry;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_registry();
///     let sessions = handle.get_all_sessions().await;
///     assert!(sessions.is_empty());
/// }
/// ```
pub fn spawn_registry() -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

    let actor = RegistryActor::new(cmd_rx, event_tx.clone());
    tokio::spawn(actor.run());

    RegistryHandle::new(cmd_tx, event_tx)
}
