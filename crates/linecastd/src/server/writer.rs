//! Per-session writer task.
//!
//! Each session owns the write half of its socket through one of these.
//! The registry queues rendered lines on a bounded channel; the writer
//! drains it and writes one line at a time under a deadline.
//!
//! - A failed write is logged and the writer moves on to the next line.
//!   The session stays registered; only its read loop ends it.
//! - A write that exceeds the deadline marks the peer unresponsive: the
//!   writer cancels the session token, which ends the read loop and runs
//!   the normal teardown.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use linecast_core::ConnectionId;

pub(crate) struct SessionWriter<W> {
    id: ConnectionId,
    writer: W,
    outbound: mpsc::Receiver<Arc<str>>,
    write_timeout: Duration,
    cancel_token: CancellationToken,
}

impl<W> SessionWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(
        id: ConnectionId,
        writer: W,
        outbound: mpsc::Receiver<Arc<str>>,
        write_timeout: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            id,
            writer,
            outbound,
            write_timeout,
            cancel_token,
        }
    }

    /// Drains the queue until cancelled or until every sender is gone.
    /// Returns the number of lines written.
    pub(crate) async fn run(mut self) -> u64 {
        let mut written: u64 = 0;
        let mut failed: u64 = 0;

        loop {
            let line = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                next = self.outbound.recv() => match next {
                    Some(line) => line,
                    None => break,
                },
            };

            let result = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                result = timeout(self.write_timeout, write_line(&mut self.writer, &line)) => result,
            };

            match result {
                Ok(Ok(())) => written += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    warn!(conn = %self.id, error = %e, "Failed to write to session");
                }
                Err(_) => {
                    warn!(
                        conn = %self.id,
                        timeout = ?self.write_timeout,
                        "Write timed out, disconnecting unresponsive peer"
                    );
                    self.cancel_token.cancel();
                    break;
                }
            }
        }

        debug!(conn = %self.id, written, failed, "Session writer stopped");
        written
    }
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
