//! Token Sync Binary
//!
//! Starts the dashboard synchronization client.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin token-sync
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `TOKEN_SYNC_BASE_URL`: Dashboard backend base URL (http:// or https://)
//!
//! ## Optional
//! - `TOKEN_SYNC_PING_INTERVAL_SECS`: Keepalive ping cadence (default: 30)
//! - `TOKEN_SYNC_PONG_TIMEOUT_SECS`: Silence tolerated before reconnecting (default: 60)
//! - `TOKEN_SYNC_RECONNECT_DELAY_SECS`: Delay between reconnection attempts (default: 5)
//! - `TOKEN_SYNC_MAX_RECONNECT_ATTEMPTS`: Attempt budget, 0 = unlimited (default: 0)
//! - `TOKEN_SYNC_HTTP_TIMEOUT_SECS`: REST request timeout (default: 10)
//! - `TOKEN_SYNC_LOG_CAPACITY`: Retained message history size (default: 100)
//! - `TOKEN_SYNC_METRICS_PORT`: Prometheus metrics port, 0 disables (default: 9464)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4318>)
//! - `OTEL_SERVICE_NAME`: Service name (default: tokendash-token-sync)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use token_sync::infrastructure::telemetry;
use token_sync::{
    ApiClient, ConnectionStatus, KeepaliveConfig, MessageLog, ReconnectConfig, StreamClient,
    StreamClientConfig, StreamEvent, StreamMessage, SyncConfig, TokenStore, ViewSynchronizer,
    init_metrics,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Interval between status summary log lines.
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Token Sync");

    let config = SyncConfig::from_env().context("failed to load configuration")?;
    log_config(&config);

    // Initialize Prometheus metrics; without an exporter every record call
    // is a no-op, so a failed bind degrades rather than aborts
    if config.metrics_port > 0
        && let Err(e) = init_metrics(config.metrics_port)
    {
        tracing::warn!(error = %e, "Metrics exporter failed to start");
    }

    let shutdown_token = CancellationToken::new();

    // Shared state: connection status, message history, token collection
    let status = Arc::new(ConnectionStatus::new());
    let message_log = Arc::new(MessageLog::new(config.log_capacity));
    let store = Arc::new(TokenStore::new());

    let api_client =
        Arc::new(ApiClient::from_config(&config).context("failed to build API client")?);

    // Advisory probe; the stream client retries on its own either way
    match api_client.check_health().await {
        Ok(health) => tracing::info!(status = %health.status, "Dashboard backend reachable"),
        Err(e) => tracing::warn!(error = %e, "Dashboard health check failed"),
    }

    // Create the event channel between the stream client and synchronizer
    let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(1024);

    let stream_config = StreamClientConfig {
        url: config.ws_url(),
        reconnect: ReconnectConfig {
            max_attempts: config.stream.max_reconnect_attempts,
            ..ReconnectConfig::fixed(config.stream.reconnect_delay)
        },
        keepalive: KeepaliveConfig {
            ping_interval: config.stream.ping_interval,
            pong_timeout: config.stream.pong_timeout,
        },
    };
    let stream_client = Arc::new(StreamClient::new(
        stream_config,
        Arc::clone(&message_log),
        Arc::clone(&status),
        event_tx,
        shutdown_token.clone(),
    ));

    let synchronizer = Arc::new(ViewSynchronizer::new(api_client, Arc::clone(&store)));

    // Seed the collection before any stream event arrives
    synchronizer.refresh().await;

    // Spawn the event fold
    let fold = Arc::clone(&synchronizer);
    tokio::spawn(async move {
        fold.run(event_rx).await;
    });

    // Spawn the stream session
    Arc::clone(&stream_client).connect();

    // Spawn the periodic status summary
    let reporter_status = Arc::clone(&status);
    let reporter_store = Arc::clone(&store);
    let reporter_log = Arc::clone(&message_log);
    let reporter_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        run_status_reporter(reporter_status, reporter_store, reporter_log, reporter_shutdown).await;
    });

    tracing::info!("Token sync ready");

    await_shutdown(shutdown_token).await;

    stream_client.disconnect();

    tracing::info!("Token sync stopped");
    Ok(())
}

/// Log a one-line state summary on a fixed interval.
async fn run_status_reporter(
    status: Arc<ConnectionStatus>,
    store: Arc<TokenStore>,
    message_log: Arc<MessageLog<StreamMessage>>,
    shutdown: CancellationToken,
) {
    let mut timer = tokio::time::interval(STATUS_INTERVAL);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => return,
            _ = timer.tick() => {
                tracing::info!(
                    state = status.state().as_str(),
                    tokens = store.len(),
                    buffered = message_log.len(),
                    messages = status.messages_received(),
                    reconnects = status.reconnect_attempts(),
                    "synchronizer status"
                );
            }
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &SyncConfig) {
    tracing::info!(
        base_url = %config.api_base_url(),
        ping_interval_secs = config.stream.ping_interval.as_secs(),
        pong_timeout_secs = config.stream.pong_timeout.as_secs(),
        reconnect_delay_secs = config.stream.reconnect_delay.as_secs(),
        max_reconnect_attempts = config.stream.max_reconnect_attempts,
        log_capacity = config.log_capacity,
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(ws_url = %config.ws_url(), "WebSocket endpoint");
}

/// Load .env from the current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
