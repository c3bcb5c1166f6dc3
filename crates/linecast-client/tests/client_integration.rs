//! Client integration tests.
//!
//! Drive `ChatClient::run_with` against a scripted listener and against a
//! real relay, using in-memory pipes for input and output.

use std::time::Duration;

use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use linecast_client::{ChatClient, ClientConfig, ClientError, SessionEnd, SERVER_PREFIX};
use linecastd::config::ServerConfig;
use linecastd::server::RelayServer;

const WAIT: Duration = Duration::from_secs(5);

fn config_for(port: u16, user: &str) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        user: user.to_string(),
    }
}

#[tokio::test]
async fn test_sends_handshake_and_prints_server_lines() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        let handshake = lines.next_line().await.unwrap().unwrap();
        write_half.write_all(b"hello there\n").await.unwrap();
        handshake
    });

    let client = ChatClient::connect(&config_for(port, "bob")).await.unwrap();
    let (_input_tx, input_rx) = duplex(256);
    let (output_tx, output_rx) = duplex(256);

    let end = timeout(WAIT, client.run_with(BufReader::new(input_rx), output_tx))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(end, SessionEnd::ServerClosed);
    assert_eq!(server.await.unwrap(), "User=bob");

    let mut printed = BufReader::new(output_rx).lines();
    let line = printed.next_line().await.unwrap().unwrap();
    assert_eq!(line, format!("{SERVER_PREFIX}hello there"));
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = ChatClient::connect(&config_for(port, "bob")).await;
    assert!(matches!(result, Err(ClientError::Connect { .. })));
}

#[tokio::test]
async fn test_chat_through_relay() {
    let cancel = CancellationToken::new();
    let server = RelayServer::bind(
        ServerConfig {
            bind_address: "127.0.0.1".parse().unwrap(),
            port: 0,
            max_connections: 2,
            ..Default::default()
        },
        cancel.clone(),
    )
    .await
    .unwrap();
    let port = server.local_addr().unwrap().port();
    let registry = server.registry();
    let mut events = registry.subscribe();
    let server_task = tokio::spawn(server.run());

    let client = ChatClient::connect(&config_for(port, "alice")).await.unwrap();
    timeout(WAIT, events.recv()).await.unwrap().unwrap();

    let (mut input_tx, input_rx) = duplex(256);
    let (output_tx, output_rx) = duplex(1024);
    let run = tokio::spawn(client.run_with(BufReader::new(input_rx), output_tx));

    input_tx.write_all(b"hi everyone\n").await.unwrap();

    let mut printed = BufReader::new(output_rx).lines();
    let line = timeout(WAIT, printed.next_line()).await.unwrap().unwrap().unwrap();
    assert!(line.starts_with(&format!("{SERVER_PREFIX}[alice] [")), "got {line:?}");
    assert!(line.ends_with("] - hi everyone"), "got {line:?}");

    drop(input_tx);
    let end = timeout(WAIT, run).await.unwrap().unwrap().unwrap();
    assert_eq!(end, SessionEnd::InputClosed);

    cancel.cancel();
    timeout(WAIT, server_task).await.unwrap().unwrap().unwrap();
}
