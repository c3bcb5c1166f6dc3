//! The broadcaster - single consumer of chat lines.
//!
//! Read loops push [`OutboundMessage`]s into a bounded mpsc queue. One
//! task drains it and, for each message in queue order, asks the
//! registry to queue the line on every live session. The next message is
//! only taken once that pass has finished, so message *i* reaches every
//! session present at that moment before message *i+1* reaches anyone.
//!
//! The broadcaster never touches a socket. Each session has its own
//! bounded queue and writer task (see `server::writer`). When a queue is
//! full the broadcaster waits for room, at most `backlog_timeout` and
//! concurrently across such peers. A peer that does not catch up in time
//! is disconnected; no registered peer silently misses a line.

use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use linecast_core::OutboundMessage;

use crate::registry::{Delivery, FanOutReport, RegistryHandle};

/// Producer side of the broadcaster queue.
///
/// Cheap to clone; every read loop holds one.
#[derive(Debug, Clone)]
pub struct BroadcastQueue {
    sender: mpsc::Sender<OutboundMessage>,
}

impl BroadcastQueue {
    /// Enqueues a message, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// `BroadcastError::Stopped` once the broadcaster has exited.
    pub async fn push(&self, message: OutboundMessage) -> Result<(), BroadcastError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| BroadcastError::Stopped)
    }

    /// True once the broadcaster has exited.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Single consumer that fans each message out through the registry.
pub struct Broadcaster {
    queue: mpsc::Receiver<OutboundMessage>,
    registry: RegistryHandle,
    backlog_timeout: Duration,
    cancel_token: CancellationToken,
}

impl Broadcaster {
    /// Creates a broadcaster and the queue feeding it.
    pub fn new(
        capacity: usize,
        backlog_timeout: Duration,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> (Self, BroadcastQueue) {
        let (sender, queue) = mpsc::channel(capacity);
        let broadcaster = Self {
            queue,
            registry,
            backlog_timeout,
            cancel_token,
        };
        (broadcaster, BroadcastQueue { sender })
    }

    /// Runs until cancelled, until every queue handle is dropped, or
    /// until the registry goes away. Returns the number of messages
    /// fanned out.
    pub async fn run(mut self) -> u64 {
        let mut processed: u64 = 0;

        loop {
            let message = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    debug!("Broadcaster shutting down");
                    break;
                }
                next = self.queue.recv() => match next {
                    Some(message) => message,
                    None => {
                        debug!("Broadcast queue closed");
                        break;
                    }
                },
            };

            debug!(
                user = %message.sender(),
                line = message.as_line().trim_end(),
                "Broadcasting"
            );

            match self.registry.fan_out(message.shared_line()).await {
                Ok(mut report) => {
                    if !report.backlogged.is_empty() {
                        tokio::select! {
                            _ = self.cancel_token.cancelled() => {
                                debug!("Broadcaster shutting down");
                                break;
                            }
                            _ = self.drain_backlog(&message, &mut report) => {}
                        }
                    }
                    processed += 1;
                    if !report.is_complete() {
                        warn!(
                            recipients = report.recipients,
                            delivered = report.delivered,
                            closed = report.closed,
                            disconnected = report.disconnected,
                            "Broadcast not delivered to every session"
                        );
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Registry unavailable, stopping broadcaster");
                    break;
                }
            }
        }

        info!(processed, "Broadcaster stopped");
        processed
    }

    /// Finishes deliveries the registry could not queue immediately.
    async fn drain_backlog(&self, message: &OutboundMessage, report: &mut FanOutReport) {
        let pending = std::mem::take(&mut report.backlogged);
        debug!(peers = pending.len(), "Waiting for slow peers");

        let outcomes = join_all(
            pending
                .into_iter()
                .map(|peer| peer.deliver(message.shared_line(), self.backlog_timeout)),
        )
        .await;

        for outcome in outcomes {
            match outcome {
                Delivery::Queued => report.delivered += 1,
                Delivery::TimedOut => report.disconnected += 1,
                Delivery::Closed | Delivery::QueueFull => report.closed += 1,
            }
        }
    }
}

/// Spawns a broadcaster task and returns its queue and join handle.
pub fn spawn_broadcaster(
    capacity: usize,
    backlog_timeout: Duration,
    registry: RegistryHandle,
    cancel_token: CancellationToken,
) -> (BroadcastQueue, JoinHandle<u64>) {
    let (broadcaster, queue) = Broadcaster::new(capacity, backlog_timeout, registry, cancel_token);
    (queue, tokio::spawn(broadcaster.run()))
}

/// Errors raised by the broadcast queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    #[error("Broadcaster has stopped")]
    Stopped,
}
