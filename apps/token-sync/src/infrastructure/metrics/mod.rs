//! Prometheus Metrics
//!
//! Counters and gauges for the synchronization client: connection health,
//! frame decoding, collection refreshes, and trade folding. The exporter
//! serves `/metrics` on its own listener so the client needs no HTTP
//! surface of its own.

use std::net::{Ipv4Addr, SocketAddr};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::domain::connection::ConnectionState;

/// Error type for metrics initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to install the metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Initialize the Prometheus exporter on the given port.
///
/// Binds `0.0.0.0:<port>` and serves metrics at `/metrics`. Call once at
/// startup, before anything records a metric.
///
/// # Errors
///
/// Returns an error if the exporter fails to start, e.g. the port is
/// already in use.
pub fn init_metrics(port: u16) -> Result<(), MetricsError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    register_metrics();
    tracing::info!(addr = %addr, "Prometheus metrics exporter started");
    Ok(())
}

/// Register metric descriptions for the exporter.
fn register_metrics() {
    describe_counter!(
        "token_sync_frames_received_total",
        "Stream frames received, labeled by message type"
    );
    describe_counter!(
        "token_sync_decode_failures_total",
        "Stream frames dropped because they could not be decoded"
    );
    describe_counter!(
        "token_sync_reconnect_attempts_total",
        "Reconnection attempts against the dashboard stream"
    );
    describe_counter!(
        "token_sync_intents_dropped_total",
        "Subscribe/unsubscribe requests dropped while disconnected"
    );
    describe_counter!(
        "token_sync_refreshes_total",
        "Full collection refreshes, labeled by outcome"
    );
    describe_counter!(
        "token_sync_trades_merged_total",
        "Trade deltas merged into the collection"
    );
    describe_counter!(
        "token_sync_trades_discarded_total",
        "Trade deltas discarded, labeled by reason"
    );
    describe_gauge!(
        "token_sync_connection_state",
        "Stream connection state (0=disconnected, 1=connecting, 2=connected)"
    );
    describe_gauge!(
        "token_sync_tracked_tokens",
        "Tokens currently held in the collection"
    );
    describe_gauge!(
        "token_sync_subscriptions",
        "Token addresses with an active subscription"
    );
}

// =============================================================================
// Label Types
// =============================================================================

/// Outcome of a full collection refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot fetched and the collection replaced.
    Replaced,
    /// Fetch failed; the previous collection was kept.
    Failed,
}

impl RefreshOutcome {
    /// Label value for the refresh counter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Replaced => "replaced",
            Self::Failed => "failed",
        }
    }
}

/// Reason a trade delta was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// No tracked token carries the address.
    UnknownToken,
    /// The delta carried no volume.
    MissingVolume,
}

impl DiscardReason {
    /// Label value for the discard counter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownToken => "unknown_token",
            Self::MissingVolume => "missing_volume",
        }
    }
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record one received stream frame.
pub fn record_frame_received(message_type: &'static str) {
    counter!("token_sync_frames_received_total", "message_type" => message_type).increment(1);
}

/// Record one dropped undecodable frame.
pub fn record_decode_failure() {
    counter!("token_sync_decode_failures_total").increment(1);
}

/// Record one reconnection attempt.
pub fn record_reconnect_attempt() {
    counter!("token_sync_reconnect_attempts_total").increment(1);
}

/// Record one dropped subscribe/unsubscribe intent.
pub fn record_intent_dropped(action: &'static str) {
    counter!("token_sync_intents_dropped_total", "action" => action).increment(1);
}

/// Record one full collection refresh.
pub fn record_refresh(outcome: RefreshOutcome) {
    counter!("token_sync_refreshes_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record one merged trade delta.
pub fn record_trade_merged() {
    counter!("token_sync_trades_merged_total").increment(1);
}

/// Record one discarded trade delta.
pub fn record_trade_discarded(reason: DiscardReason) {
    counter!("token_sync_trades_discarded_total", "reason" => reason.as_str()).increment(1);
}

/// Record the current connection state.
pub fn record_connection_state(state: ConnectionState) {
    gauge!("token_sync_connection_state").set(state_gauge_value(state));
}

/// Record the current collection size.
#[allow(clippy::cast_precision_loss)]
pub fn record_tracked_tokens(count: usize) {
    gauge!("token_sync_tracked_tokens").set(count as f64);
}

/// Record the current subscription count.
#[allow(clippy::cast_precision_loss)]
pub fn record_subscription_count(count: usize) {
    gauge!("token_sync_subscriptions").set(count as f64);
}

const fn state_gauge_value(state: ConnectionState) -> f64 {
    match state {
        ConnectionState::Disconnected => 0.0,
        ConnectionState::Connecting => 1.0,
        ConnectionState::Connected => 2.0,
    }
}
