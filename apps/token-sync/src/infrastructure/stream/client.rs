//! Dashboard Stream Client
//!
//! Maintains the WebSocket connection to the dashboard backend. Decoded
//! frames land in the shared message log and flow to the synchronizer as
//! events; a lost connection is retried on a fixed interval until
//! [`StreamClient::disconnect`] is called.
//!
//! # Protocol
//!
//! Frames are single JSON objects tagged by a `type` field. The client
//! sends `subscribe`/`unsubscribe` control frames and receives `newToken`
//! and `tokenTrade` notifications.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::domain::connection::{ConnectionState, ConnectionStatus};
use crate::domain::log::MessageLog;
use crate::domain::subscription::SubscriptionSet;
use crate::infrastructure::metrics;

use super::codec::JsonCodec;
use super::keepalive::{Keepalive, KeepaliveConfig, KeepaliveTick};
use super::messages::{ControlAction, ControlRequest, StreamMessage};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};

/// Depth of the outbound control frame queue.
const COMMAND_QUEUE_DEPTH: usize = 64;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the stream client.
#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] super::codec::CodecError),

    /// Server closed the connection or the stream ended.
    #[error("connection closed")]
    ConnectionClosed,

    /// No pong arrived within the keepalive timeout.
    #[error("keepalive timeout")]
    KeepaliveTimeout,

    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectAttemptsExceeded,
}

// =============================================================================
// Stream Events
// =============================================================================

/// Events emitted by the stream client.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Connection established.
    Connected,
    /// Connection lost.
    Disconnected,
    /// Waiting to reconnect.
    Reconnecting {
        /// Reconnection attempt number.
        attempt: u32,
    },
    /// Decoded inbound frame.
    Message(StreamMessage),
    /// A frame could not be decoded and was dropped.
    DecodeFailed {
        /// Decoder error description.
        reason: String,
    },
    /// A subscribe or unsubscribe request arrived while the connection was
    /// not established, and was dropped.
    IntentDropped {
        /// The dropped action.
        action: ControlAction,
        /// Token address the action applied to.
        token: String,
    },
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the stream client.
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// WebSocket URL of the dashboard stream.
    pub url: String,
    /// Reconnection behavior.
    pub reconnect: ReconnectConfig,
    /// Keepalive behavior.
    pub keepalive: KeepaliveConfig,
}

impl StreamClientConfig {
    /// Create a configuration with default reconnect and keepalive behavior.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect: ReconnectConfig::default(),
            keepalive: KeepaliveConfig::default(),
        }
    }
}

// =============================================================================
// Stream Client
// =============================================================================

/// One spawned connection lifecycle. `cancel` tears down the session and
/// any reconnect sleep inside it.
#[derive(Debug)]
struct Session {
    id: u64,
    cancel: CancellationToken,
}

/// WebSocket client for the dashboard stream.
///
/// [`connect`](Self::connect) is idempotent: while a session is active,
/// further calls do nothing. [`disconnect`](Self::disconnect) tears the
/// session down, including a pending reconnect wait, and no reconnection
/// happens until `connect` is called again.
#[derive(Debug)]
pub struct StreamClient {
    config: StreamClientConfig,
    codec: JsonCodec,
    log: Arc<MessageLog<StreamMessage>>,
    status: Arc<ConnectionStatus>,
    subscriptions: SubscriptionSet,
    event_tx: mpsc::Sender<StreamEvent>,
    command_tx: mpsc::Sender<ControlRequest>,
    command_rx: tokio::sync::Mutex<mpsc::Receiver<ControlRequest>>,
    session: parking_lot::Mutex<Option<Session>>,
    session_counter: AtomicU64,
    shutdown: CancellationToken,
}

impl StreamClient {
    /// Create a new stream client.
    ///
    /// `shutdown` is the process-level token; cancelling it ends the active
    /// session just like [`disconnect`](Self::disconnect).
    #[must_use]
    pub fn new(
        config: StreamClientConfig,
        log: Arc<MessageLog<StreamMessage>>,
        status: Arc<ConnectionStatus>,
        event_tx: mpsc::Sender<StreamEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        Self {
            config,
            codec: JsonCodec::new(),
            log,
            status,
            subscriptions: SubscriptionSet::new(),
            event_tx,
            command_tx,
            command_rx: tokio::sync::Mutex::new(command_rx),
            session: parking_lot::Mutex::new(None),
            session_counter: AtomicU64::new(0),
            shutdown,
        }
    }

    /// Start a connection session unless one is already active.
    ///
    /// The session runs on its own task: it dials, processes frames, and
    /// keeps retrying on a fixed interval after connection loss. Calling
    /// `connect` while a session is active is a no-op, so repeated calls
    /// produce exactly one connection attempt.
    pub fn connect(self: Arc<Self>) {
        let mut session = self.session.lock();
        if session.as_ref().is_some_and(|s| !s.cancel.is_cancelled()) {
            tracing::debug!("connect requested while a session is active, ignoring");
            return;
        }

        let id = self.session_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = self.shutdown.child_token();
        *session = Some(Session {
            id,
            cancel: cancel.clone(),
        });
        drop(session);

        self.set_state(ConnectionState::Connecting);

        let client = Arc::clone(&self);
        tokio::spawn(async move {
            if let Err(e) = client.run_session(id, cancel).await {
                tracing::error!(error = %e, "stream session ended with error");
            }
        });
    }

    /// Tear down the active session.
    ///
    /// Cancels the session task, including a reconnect wait in progress, and
    /// moves the shared state to [`ConnectionState::Disconnected`]
    /// immediately. No further reconnection happens until
    /// [`connect`](Self::connect) is called again.
    pub fn disconnect(&self) {
        let mut session = self.session.lock();
        if let Some(current) = session.take() {
            tracing::info!("disconnect requested, cancelling session");
            current.cancel.cancel();
        } else {
            tracing::debug!("disconnect requested with no active session");
        }
        drop(session);

        self.set_state(ConnectionState::Disconnected);
    }

    /// Subscribe to trade events for a token.
    ///
    /// Only sends a frame while the connection is established; otherwise the
    /// intent is dropped with a [`StreamEvent::IntentDropped`] diagnostic
    /// and nothing is queued for later. Re-subscribing a tracked token is a
    /// no-op.
    pub fn subscribe(&self, token: &str) {
        if !self.status.state().is_connected() {
            self.drop_intent(ControlAction::Subscribe, token);
            return;
        }
        if !self.subscriptions.insert(token) {
            tracing::debug!(token, "already subscribed");
            return;
        }
        metrics::record_subscription_count(self.subscriptions.len());
        self.queue_control(ControlRequest::subscribe(token));
    }

    /// Unsubscribe from trade events for a token.
    ///
    /// Follows the same connected-only contract as
    /// [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, token: &str) {
        if !self.status.state().is_connected() {
            self.drop_intent(ControlAction::Unsubscribe, token);
            return;
        }
        if !self.subscriptions.remove(token) {
            tracing::debug!(token, "not subscribed");
            return;
        }
        metrics::record_subscription_count(self.subscriptions.len());
        self.queue_control(ControlRequest::unsubscribe(token));
    }

    /// Token addresses with an active subscription.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.snapshot()
    }

    /// Check whether a session is active (connected or retrying).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|s| !s.cancel.is_cancelled())
    }

    fn drop_intent(&self, action: ControlAction, token: &str) {
        tracing::debug!(
            action = action.as_str(),
            token,
            "control request while disconnected, dropping intent"
        );
        metrics::record_intent_dropped(action.as_str());
        let _ = self.event_tx.try_send(StreamEvent::IntentDropped {
            action,
            token: token.to_string(),
        });
    }

    fn queue_control(&self, request: ControlRequest) {
        if let Err(e) = self.command_tx.try_send(request) {
            tracing::warn!(error = %e, "control frame dropped, command queue full");
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.status.set_state(state);
        metrics::record_connection_state(state);
    }

    fn clear_session(&self, id: u64) {
        let mut session = self.session.lock();
        if session.as_ref().is_some_and(|s| s.id == id) {
            *session = None;
        }
    }

    async fn run_session(
        self: Arc<Self>,
        id: u64,
        cancel: CancellationToken,
    ) -> Result<(), StreamClientError> {
        let result = self.connection_loop(&cancel).await;
        self.clear_session(id);
        result
    }

    /// Connect and process frames, retrying per the reconnect policy until
    /// cancelled or the attempt budget runs out.
    async fn connection_loop(&self, cancel: &CancellationToken) -> Result<(), StreamClientError> {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if cancel.is_cancelled() {
                tracing::info!("stream session cancelled");
                return Ok(());
            }

            match self.connect_and_run(cancel, &mut policy).await {
                Ok(()) => {
                    tracing::info!("stream session closed");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stream connection error");
                    self.status.set_error(e.to_string());
                    self.set_state(ConnectionState::Disconnected);
                    let _ = self.event_tx.send(StreamEvent::Disconnected).await;

                    if let Some(delay) = policy.next_delay() {
                        let attempt = policy.attempt_count();
                        tracing::info!(
                            attempt,
                            delay_ms = delay.as_millis(),
                            "waiting before reconnect"
                        );
                        self.status.increment_reconnect_attempts();
                        metrics::record_reconnect_attempt();
                        let _ = self
                            .event_tx
                            .send(StreamEvent::Reconnecting { attempt })
                            .await;

                        tokio::select! {
                            () = cancel.cancelled() => {
                                tracing::info!("stream session cancelled during reconnect wait");
                                return Ok(());
                            }
                            () = tokio::time::sleep(delay) => {}
                        }
                    } else {
                        tracing::error!("reconnection attempts exhausted");
                        return Err(StreamClientError::MaxReconnectAttemptsExceeded);
                    }
                }
            }
        }
    }

    /// Dial the stream and process frames until the connection drops or the
    /// session is cancelled.
    async fn connect_and_run(
        &self,
        cancel: &CancellationToken,
        policy: &mut ReconnectPolicy,
    ) -> Result<(), StreamClientError> {
        tracing::info!(url = %self.config.url, "connecting to dashboard stream");
        self.set_state(ConnectionState::Connecting);

        let (ws_stream, _response) = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            result = tokio_tungstenite::connect_async(&self.config.url) => result?,
        };

        let (mut write, mut read) = ws_stream.split();

        // Drain control frames queued against a previous session before
        // callers can observe the Connected state; the replay below
        // re-establishes the real subscription state.
        let mut commands = self.command_rx.lock().await;
        while let Ok(stale) = commands.try_recv() {
            tracing::debug!(
                action = stale.action.as_str(),
                token = %stale.token,
                "discarding stale control frame"
            );
        }

        self.set_state(ConnectionState::Connected);
        policy.reset();
        let _ = self.event_tx.send(StreamEvent::Connected).await;
        tracing::info!("dashboard stream connected");

        self.replay_subscriptions(&mut write).await?;

        let mut keepalive = Keepalive::new(self.config.keepalive.clone());
        let mut ping_timer = tokio::time::interval(self.config.keepalive.ping_interval);
        ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("session cancelled, closing socket");
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }

                _ = ping_timer.tick() => {
                    match keepalive.tick() {
                        KeepaliveTick::SendPing => {
                            write.send(Message::Ping(vec![].into())).await?;
                        }
                        KeepaliveTick::Timeout => {
                            tracing::warn!(
                                silent_for_ms = keepalive.time_since_pong().as_millis(),
                                "keepalive timeout, tearing down connection"
                            );
                            return Err(StreamClientError::KeepaliveTimeout);
                        }
                    }
                }

                command = commands.recv() => {
                    if let Some(request) = command {
                        self.send_control(&mut write, &request).await?;
                    }
                }

                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            keepalive.record_pong();
                            self.handle_text_frame(&text).await;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            keepalive.record_pong();
                        }
                        Some(Ok(Message::Ping(data))) => {
                            keepalive.record_pong();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "server closed the stream");
                            return Err(StreamClientError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Binary and raw frames are not part of the protocol
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            tracing::info!("stream ended");
                            return Err(StreamClientError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }

    /// Decode one text frame, append it to the log, and forward it.
    ///
    /// Decode failures are logged and dropped; they never tear down the
    /// connection.
    async fn handle_text_frame(&self, text: &str) {
        match self.codec.decode(text) {
            Ok(message) => {
                self.status.increment_messages();
                metrics::record_frame_received(message.tag());
                self.log.append(message.clone());
                let _ = self.event_tx.send(StreamEvent::Message(message)).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable frame");
                metrics::record_decode_failure();
                let _ = self
                    .event_tx
                    .send(StreamEvent::DecodeFailed {
                        reason: e.to_string(),
                    })
                    .await;
            }
        }
    }

    /// Re-send subscribe frames for every tracked token after a reconnect.
    async fn replay_subscriptions<W>(&self, write: &mut W) -> Result<(), StreamClientError>
    where
        W: SinkExt<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        let tracked = self.subscriptions.snapshot();
        if tracked.is_empty() {
            return Ok(());
        }
        tracing::info!(count = tracked.len(), "replaying subscriptions");
        for token in tracked {
            self.send_control(write, &ControlRequest::subscribe(token))
                .await?;
        }
        Ok(())
    }

    async fn send_control<W>(
        &self,
        write: &mut W,
        request: &ControlRequest,
    ) -> Result<(), StreamClientError>
    where
        W: SinkExt<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        let json = self.codec.encode(request)?;
        tracing::debug!(
            action = request.action.as_str(),
            token = %request.token,
            "sending control frame"
        );
        write.send(Message::Text(json.into())).await.map_err(|e| {
            StreamClientError::ConnectionFailed(format!("failed to send control frame: {e}"))
        })?;
        Ok(())
    }
}
