#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Token Sync - Real-Time Dashboard Synchronizer
//!
//! A synchronization client that keeps a local token collection aligned
//! with the Tokendash backend. A single WebSocket connection delivers
//! structural events and trade deltas; REST snapshots rebuild the
//! collection whenever its membership changes.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core synchronization state with no external dependencies
//!   - `token`: Token collection, metrics windows, trade merging
//!   - `connection`: Connection state machine and counters
//!   - `log`: Bounded message history
//!   - `subscription`: Per-token subscription tracking
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interface for the token snapshot source
//!   - `sync`: Event fold and snapshot refresh orchestration
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `stream`: WebSocket client, codec, keepalive, reconnect policy
//!   - `api`: REST client for snapshots and health checks
//!   - `config`: Environment-driven configuration
//!   - `metrics`: Prometheus metrics
//!   - `telemetry`: OpenTelemetry + tracing setup
//!
//! # Data Flow
//!
//! ```text
//!                    ┌──────────────┐   events   ┌──────────────────┐
//! Dashboard WS ─────►│ StreamClient │───────────►│ ViewSynchronizer │
//!                    └──────┬───────┘            └────────┬─────────┘
//!                           │ decoded frames              │ snapshots + deltas
//!                           ▼                             ▼
//!                      MessageLog                    TokenStore ◄── ApiClient ◄── Dashboard REST
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core synchronization state with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::{ConnectionState, ConnectionStatus};
pub use domain::log::{DEFAULT_LOG_CAPACITY, MessageLog};
pub use domain::subscription::SubscriptionSet;
pub use domain::token::{
    SortDirection, SortKey, Token, TokenLink, TokenList, TokenMetrics, TokenStore, TradeDelta,
};

// Application layer
pub use application::ports::TokenSourcePort;
pub use application::sync::ViewSynchronizer;

// Infrastructure config
pub use infrastructure::config::{ConfigError, HttpSettings, StreamSettings, SyncConfig};

// REST client
pub use infrastructure::api::{ApiClient, ApiError, HealthResponse, LocSegment, ValidationIssue};

// Stream client types (for integration tests)
pub use infrastructure::stream::{
    CodecError, ControlAction, ControlRequest, JsonCodec, KeepaliveConfig, ReconnectConfig,
    ReconnectPolicy, StreamClient, StreamClientConfig, StreamClientError, StreamEvent,
    StreamMessage, TokenTradeMessage,
};

// Metrics
pub use infrastructure::metrics::{DiscardReason, MetricsError, RefreshOutcome, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
