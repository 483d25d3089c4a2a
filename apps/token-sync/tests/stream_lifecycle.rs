//! Stream Client Lifecycle Integration Tests
//!
//! Runs the stream client against scripted local WebSocket servers to
//! exercise connection, reconnection, teardown, and subscription replay.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use token_sync::{
    ConnectionState, ConnectionStatus, MessageLog, ReconnectConfig, StreamClient,
    StreamClientConfig, StreamEvent, StreamMessage,
};

/// Bind a listener on a random port and derive the client URL for it.
async fn bind_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("ws://{addr}/api/ws"))
}

fn make_client(
    url: &str,
    reconnect: ReconnectConfig,
    event_tx: mpsc::Sender<StreamEvent>,
) -> (
    Arc<StreamClient>,
    Arc<ConnectionStatus>,
    Arc<MessageLog<StreamMessage>>,
) {
    let status = Arc::new(ConnectionStatus::new());
    let log = Arc::new(MessageLog::default());
    let mut config = StreamClientConfig::new(url);
    config.reconnect = reconnect;
    let client = Arc::new(StreamClient::new(
        config,
        Arc::clone(&log),
        Arc::clone(&status),
        event_tx,
        CancellationToken::new(),
    ));
    (client, status, log)
}

/// Receive events until one matches the predicate.
async fn wait_for(
    events: &mut mpsc::Receiver<StreamEvent>,
    predicate: impl Fn(&StreamEvent) -> bool,
) -> StreamEvent {
    loop {
        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timeout waiting for stream event")
            .expect("event channel closed");
        if predicate(&event) {
            return event;
        }
    }
}

// =============================================================================
// Connection Tests
// =============================================================================

#[tokio::test]
async fn test_connect_is_idempotent_and_survives_disconnect_cycles() {
    let (listener, url) = bind_server().await;
    let accepted = Arc::new(AtomicUsize::new(0));

    let server_accepted = Arc::clone(&accepted);
    let server = tokio::spawn(async move {
        loop {
            let (socket, _) = listener.accept().await.unwrap();
            server_accepted.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
                while let Some(Ok(frame)) = ws.next().await {
                    if let Message::Ping(data) = frame {
                        let _ = ws.send(Message::Pong(data)).await;
                    }
                }
            });
        }
    });

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (client, status, _log) = make_client(
        &url,
        ReconnectConfig::fixed(Duration::from_millis(100)),
        event_tx,
    );

    // Back-to-back calls must produce exactly one connection attempt
    Arc::clone(&client).connect();
    Arc::clone(&client).connect();

    wait_for(&mut event_rx, |e| matches!(e, StreamEvent::Connected)).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(accepted.load(Ordering::SeqCst), 1);
    assert_eq!(status.state(), ConnectionState::Connected);
    assert!(client.is_running());

    // A fresh connect after teardown dials again
    client.disconnect();
    assert_eq!(status.state(), ConnectionState::Disconnected);

    Arc::clone(&client).connect();
    wait_for(&mut event_rx, |e| matches!(e, StreamEvent::Connected)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 2);

    client.disconnect();
    server.abort();
}

#[tokio::test]
async fn test_disconnect_cancels_pending_reconnect() {
    let (listener, url) = bind_server().await;
    let accepted = Arc::new(AtomicUsize::new(0));

    let server_accepted = Arc::clone(&accepted);
    let server = tokio::spawn(async move {
        loop {
            let (socket, _) = listener.accept().await.unwrap();
            server_accepted.fetch_add(1, Ordering::SeqCst);
            // Drop the connection right after the handshake
            let ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            drop(ws);
        }
    });

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (client, status, _log) = make_client(
        &url,
        ReconnectConfig::fixed(Duration::from_millis(400)),
        event_tx,
    );

    Arc::clone(&client).connect();
    wait_for(&mut event_rx, |e| matches!(e, StreamEvent::Connected)).await;
    wait_for(&mut event_rx, |e| {
        matches!(e, StreamEvent::Reconnecting { .. })
    })
    .await;

    // The session is sleeping out the reconnect delay; tear it down mid-wait
    client.disconnect();
    assert_eq!(status.state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert_eq!(
        accepted.load(Ordering::SeqCst),
        1,
        "cancelled reconnect must not dial again"
    );
    assert!(!client.is_running());
    assert_eq!(status.reconnect_attempts(), 1);

    server.abort();
}

// =============================================================================
// Subscription Tests
// =============================================================================

#[tokio::test]
async fn test_subscribe_sends_frame_and_replays_after_reconnect() {
    let (listener, url) = bind_server().await;
    let (frames_tx, mut frames_rx) = mpsc::channel::<(usize, String)>(64);

    let server = tokio::spawn(async move {
        let mut conn = 0usize;
        loop {
            let (socket, _) = listener.accept().await.unwrap();
            conn += 1;
            let tx = frames_tx.clone();
            tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
                while let Some(Ok(frame)) = ws.next().await {
                    match frame {
                        Message::Text(text) => {
                            let _ = tx.send((conn, text.to_string())).await;
                            // Kill the first connection to force a reconnect
                            if conn == 1 {
                                let _ = ws.send(Message::Close(None)).await;
                                break;
                            }
                        }
                        Message::Ping(data) => {
                            let _ = ws.send(Message::Pong(data)).await;
                        }
                        _ => {}
                    }
                }
            });
        }
    });

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (client, _status, _log) = make_client(
        &url,
        ReconnectConfig::fixed(Duration::from_millis(100)),
        event_tx,
    );

    Arc::clone(&client).connect();
    wait_for(&mut event_rx, |e| matches!(e, StreamEvent::Connected)).await;

    client.subscribe("0xmoon");

    let (conn, frame) = timeout(Duration::from_secs(2), frames_rx.recv())
        .await
        .expect("timeout waiting for subscribe frame")
        .unwrap();
    assert_eq!(conn, 1);
    assert_eq!(frame, r#"{"type":"subscribe","token":"0xmoon"}"#);

    // The server closed connection 1; the client reconnects and replays
    let (conn, frame) = timeout(Duration::from_secs(2), frames_rx.recv())
        .await
        .expect("timeout waiting for replayed frame")
        .unwrap();
    assert_eq!(conn, 2);
    assert_eq!(frame, r#"{"type":"subscribe","token":"0xmoon"}"#);
    assert_eq!(client.subscriptions(), vec!["0xmoon"]);

    client.disconnect();
    server.abort();
}

// =============================================================================
// Decode Resilience Tests
// =============================================================================

#[tokio::test]
async fn test_undecodable_frame_is_dropped_without_teardown() {
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
        ws.send(Message::Text("this is not json".into()))
            .await
            .unwrap();
        ws.send(Message::Text(r#"{"type":"newToken"}"#.into()))
            .await
            .unwrap();
        while let Some(Ok(frame)) = ws.next().await {
            if let Message::Ping(data) = frame {
                let _ = ws.send(Message::Pong(data)).await;
            }
        }
    });

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (client, status, log) = make_client(
        &url,
        ReconnectConfig::fixed(Duration::from_millis(100)),
        event_tx,
    );

    Arc::clone(&client).connect();
    wait_for(&mut event_rx, |e| matches!(e, StreamEvent::Connected)).await;

    let dropped = wait_for(&mut event_rx, |e| {
        matches!(e, StreamEvent::DecodeFailed { .. })
    })
    .await;
    if let StreamEvent::DecodeFailed { reason } = dropped {
        assert!(!reason.is_empty());
    }

    let message = wait_for(&mut event_rx, |e| matches!(e, StreamEvent::Message(_))).await;
    assert!(matches!(
        message,
        StreamEvent::Message(StreamMessage::NewToken)
    ));

    // Only the decodable frame reached the log, and the connection survived
    assert_eq!(log.snapshot(), vec![StreamMessage::NewToken]);
    assert_eq!(status.state(), ConnectionState::Connected);
    assert_eq!(status.reconnect_attempts(), 0);
    assert_eq!(status.messages_received(), 1);

    client.disconnect();
    server.abort();
}
