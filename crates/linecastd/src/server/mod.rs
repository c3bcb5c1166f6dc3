//! TCP relay server.
//!
//! Owns the listening socket and the accept loop. Every accepted
//! connection either gets an admission slot and its own session task, or
//! is closed on the spot without a byte being written.
//!
//! Accept failures (for example running out of file descriptors) are
//! logged and the loop keeps serving after a short pause. The server only
//! stops when its cancellation token fires.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()` or `.expect()` outside tests
//! - Session task failures are logged when reaped, never propagated

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use linecast_core::ConnectionId;

use crate::admission::AdmissionController;
use crate::broadcast::{spawn_broadcaster, BroadcastQueue};
use crate::config::{ConfigError, ServerConfig};
use crate::registry::{spawn_registry, RegistryHandle};

mod session;
mod writer;

pub use session::SessionError;

use session::SessionTask;

/// Pause after a failed `accept` before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// The relay: listener, registry, and admission control.
pub struct RelayServer {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    registry: RegistryHandle,
    admission: AdmissionController,
    cancel_token: CancellationToken,
    connection_counter: AtomicU64,
}

impl RelayServer {
    /// Validates `config` and binds the listening socket.
    ///
    /// Binding happens here rather than in [`run`](Self::run) so callers
    /// can learn the real address when asking for port 0.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` if a limit is zero
    /// - `ServerError::Bind` if the address cannot be bound
    pub async fn bind(
        config: ServerConfig,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            admission: AdmissionController::new(config.max_connections),
            registry: spawn_registry(),
            config: Arc::new(config),
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::LocalAddr)
    }

    /// Handle to the session registry.
    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Admission controller shared with session tasks.
    pub fn admission(&self) -> AdmissionController {
        self.admission.clone()
    }

    /// Serves connections until the cancellation token fires, then waits
    /// for every session to tear down and the broadcaster to stop.
    pub async fn run(self) -> Result<(), ServerError> {
        let local_addr = self.local_addr()?;
        let (queue, broadcaster) = spawn_broadcaster(
            self.config.broadcast_queue,
            self.config.write_timeout,
            self.registry.clone(),
            self.cancel_token.clone(),
        );
        let mut sessions: JoinSet<()> = JoinSet::new();

        info!(
            addr = %local_addr,
            max_connections = self.config.max_connections,
            "Relay listening"
        );

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => match result {
                    Ok((stream, peer)) => self.admit(stream, peer, &queue, &mut sessions),
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },

                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Session task failed");
                    }
                }
            }
        }

        // Session tokens are children of ours, so every task is on its way out.
        while let Some(joined) = sessions.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Session task failed during shutdown");
            }
        }

        drop(queue);
        if let Err(e) = broadcaster.await {
            error!(error = %e, "Broadcaster task failed");
        }

        info!("Relay stopped");
        Ok(())
    }

    fn admit(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        queue: &BroadcastQueue,
        sessions: &mut JoinSet<()>,
    ) {
        let id = ConnectionId::new(self.connection_counter.fetch_add(1, Ordering::Relaxed));

        let Some(slot) = self.admission.try_acquire() else {
            warn!(
                conn = %id,
                peer = %peer,
                max_connections = self.admission.capacity(),
                "Connection rejected: server at capacity"
            );
            drop(stream);
            return;
        };

        debug!(
            conn = %id,
            peer = %peer,
            active = self.admission.held(),
            "Connection admitted"
        );

        let task = SessionTask {
            id,
            peer,
            stream,
            slot,
            registry: self.registry.clone(),
            queue: queue.clone(),
            config: Arc::clone(&self.config),
            cancel_token: self.cancel_token.child_token(),
        };
        sessions.spawn(task.run());
    }
}
