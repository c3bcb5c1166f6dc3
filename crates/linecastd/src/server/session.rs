//! One admitted connection, from handshake to teardown.
//!
//! A `SessionTask` is spawned for every connection that obtained an
//! admission slot. It owns the slot for its whole life and gives it back
//! only after the session has left the registry and the socket is closed.
//!
//! ```text
//!   handshake ──▶ spawn writer ──▶ register ──▶ read loop ──▶ teardown
//!   (timeout)                                   (push to       remove
//!                                                broadcaster)  cancel writer
//!                                                              close socket
//!                                                              release slot
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use linecast_core::{ConnectionId, DisplayName, OutboundMessage, SessionInfo};
use linecast_protocol::{line_codec, Handshake};

use super::writer::SessionWriter;
use crate::admission::AdmissionSlot;
use crate::broadcast::{BroadcastError, BroadcastQueue};
use crate::config::ServerConfig;
use crate::registry::{RegistryHandle, Session};

/// Why a session ended before its peer closed the connection.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Connection closed before handshake")]
    Closed,

    #[error("No handshake within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("Line exceeds maximum length")]
    LineTooLong,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session cancelled")]
    Cancelled,

    #[error(transparent)]
    Broadcaster(#[from] BroadcastError),
}

impl From<LinesCodecError> for SessionError {
    fn from(e: LinesCodecError) -> Self {
        match e {
            LinesCodecError::MaxLineLengthExceeded => SessionError::LineTooLong,
            LinesCodecError::Io(e) => SessionError::Io(e),
        }
    }
}

pub(crate) struct SessionTask {
    pub(crate) id: ConnectionId,
    pub(crate) peer: SocketAddr,
    pub(crate) stream: TcpStream,
    pub(crate) slot: AdmissionSlot,
    pub(crate) registry: RegistryHandle,
    pub(crate) queue: BroadcastQueue,
    pub(crate) config: Arc<ServerConfig>,
    pub(crate) cancel_token: CancellationToken,
}

impl SessionTask {
    pub(crate) async fn run(self) {
        let SessionTask {
            id,
            peer,
            stream,
            slot,
            registry,
            queue,
            config,
            cancel_token,
        } = self;

        let (read_half, write_half) = stream.into_split();
        let mut lines = FramedRead::new(read_half, line_codec(config.max_line_length));

        let handshake =
            match read_handshake(&mut lines, config.handshake_timeout, &cancel_token).await {
                Ok(handshake) => handshake,
                Err(e) => {
                    warn!(conn = %id, peer = %peer, error = %e, "Handshake failed");
                    drop(lines);
                    drop(write_half);
                    slot.release();
                    return;
                }
            };

        let name = handshake.user();
        if name.is_empty() {
            debug!(conn = %id, headers = handshake.len(), "Handshake carried no User header");
        }

        let session_token = cancel_token.child_token();
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue);
        let writer = SessionWriter::new(
            id,
            write_half,
            outbound_rx,
            config.write_timeout,
            session_token.clone(),
        );
        let writer_task = tokio::spawn(writer.run());

        let info = SessionInfo::new(id, name.clone(), Some(peer));
        if let Err(e) = registry
            .register(Session::new(info, outbound_tx, session_token.clone()))
            .await {
            error!(conn = %id, error = %e, "Failed to register session");
            session_token.cancel();
            let _ = writer_task.await;
            drop(lines);
            slot.release();
            return;
        }

        match read_loop(id, &name, &mut lines, &queue, &session_token).await {
            Ok(()) => debug!(conn = %id, user = %name, "Peer closed connection"),
            Err(e) => debug!(conn = %id, user = %name, error = %e, "Read loop ended"),
        }

        // Leave the registry before the socket closes; the slot goes last.
        if let Err(e) = registry.remove(id).await {
            warn!(conn = %id, error = %e, "Session missing from registry at teardown");
        }
        session_token.cancel();
        if let Err(e) = writer_task.await {
            error!(conn = %id, error = %e, "Session writer task failed");
        }
        drop(lines);
        slot.release();

        info!(conn = %id, user = %name, peer = %peer, "Session closed");
    }
}

/// Reads the first line and parses it as a handshake.
async fn read_handshake<R>(
    lines: &mut FramedRead<R, LinesCodec>,
    limit: Duration,
    cancel_token: &CancellationToken,
) -> Result<Handshake, SessionError>
where
    R: AsyncRead + Unpin,
{
    let next = tokio::select! {
        _ = cancel_token.cancelled() => return Err(SessionError::Cancelled),
        next = timeout(limit, lines.next()) => {
            next.map_err(|_| SessionError::HandshakeTimeout(limit))?
        }
    };

    match next {
        Some(Ok(line)) => Ok(Handshake::parse(&line)),
        Some(Err(e)) => Err(e.into()),
        None => Err(SessionError::Closed),
    }
}

/// Stamps every received line and hands it to the broadcaster.
///
/// Returns `Ok(())` when the peer closes the connection.
async fn read_loop<R>(
    id: ConnectionId,
    name: &DisplayName,
    lines: &mut FramedRead<R, LinesCodec>,
    queue: &BroadcastQueue,
    cancel_token: &CancellationToken,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let next = tokio::select! {
            _ = cancel_token.cancelled() => return Err(SessionError::Cancelled),
            next = lines.next() => next,
        };

        let line = match next {
            Some(Ok(line)) => line,
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(()),
        };

        debug!(conn = %id, user = %name, len = line.len(), "Line received");
        let message = OutboundMessage::now(name.clone(), &line);

        tokio::select! {
            _ = cancel_token.cancelled() => return Err(SessionError::Cancelled),
            pushed = queue.push(message) => pushed?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

    use crate::broadcast::spawn_broadcaster;
    use crate::registry::spawn_registry;

    const WAIT: Duration = Duration::from_secs(2);

    fn framed(max: usize) -> (DuplexStream, FramedRead<DuplexStream, LinesCodec>) {
        let (client, server) = duplex(1024);
        (client, FramedRead::new(server, line_codec(max)))
    }

    #[tokio::test]
    async fn test_handshake_reads_first_line() {
        let (mut client, mut lines) = framed(1024);
        client.write_all(b"User=bob\r\nignored\n").await.unwrap();

        let handshake = read_handshake(&mut lines, WAIT, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(handshake.user().as_str(), "bob");
    }

    #[tokio::test]
    async fn test_handshake_without_user_yields_empty_name() {
        let (mut client, mut lines) = framed(1024);
        client.write_all(b"Nick=bob\n").await.unwrap();

        let handshake = read_handshake(&mut lines, WAIT, &CancellationToken::new())
            .await
            .unwrap();
        assert!(handshake.user().is_empty());
    }

    #[tokio::test]
    async fn test_handshake_closed_connection() {
        let (client, mut lines) = framed(1024);
        drop(client);

        let err = read_handshake(&mut lines, WAIT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_times_out() {
        let (_client, mut lines) = framed(1024);
        let limit = Duration::from_secs(5);

        let err = read_handshake(&mut lines, limit, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::HandshakeTimeout(d) if d == limit));
    }

    #[tokio::test]
    async fn test_handshake_line_too_long() {
        let (mut client, mut lines) = framed(8);
        client.write_all(b"User=someone-long\n").await.unwrap();

        let err = read_handshake(&mut lines, WAIT, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::LineTooLong));
    }

    #[tokio::test]
    async fn test_handshake_cancelled() {
        let (_client, mut lines) = framed(1024);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = read_handshake(&mut lines, WAIT, &cancel).await.unwrap_err();
        assert!(matches!(err, SessionError::Cancelled));
    }

    #[tokio::test]
    async fn test_read_loop_stamps_lines_with_sender() {
        let registry = spawn_registry();
        let (tx, mut rx) = mpsc::channel(8);
        let info = SessionInfo::new(ConnectionId::new(9), DisplayName::from("watcher"), None);
        registry
            .register(Session::new(info, tx, CancellationToken::new()))
            .await
            .unwrap();

        let (queue, _broadcaster) = spawn_broadcaster(8, WAIT, registry, CancellationToken::new());
        let (mut client, mut lines) = framed(1024);
        client.write_all(b"hello\nworld\n").await.unwrap();
        drop(client);

        let name = DisplayName::from("alice");
        let result = read_loop(
            ConnectionId::new(1),
            &name,
            &mut lines,
            &queue,
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_ok());

        let first = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(first.starts_with("[alice] ["));
        assert!(first.ends_with("] - hello\n"));
        let second = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(second.ends_with("] - world\n"));
    }

    #[tokio::test]
    async fn test_read_loop_fails_when_broadcaster_gone() {
        let registry = spawn_registry();
        let cancel = CancellationToken::new();
        let (queue, broadcaster) = spawn_broadcaster(1, WAIT, registry, cancel.clone());
        cancel.cancel();
        broadcaster.await.unwrap();

        let (mut client, mut lines) = framed(1024);
        client.write_all(b"lost\n").await.unwrap();

        let name = DisplayName::from("alice");
        let err = read_loop(
            ConnectionId::new(1),
            &name,
            &mut lines,
            &queue,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SessionError::Broadcaster(BroadcastError::Stopped)));
    }
}
