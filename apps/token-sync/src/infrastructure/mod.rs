//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Dashboard REST API client.
pub mod api;

/// Configuration loading.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Dashboard WebSocket stream adapter.
pub mod stream;

/// OpenTelemetry tracing integration.
pub mod telemetry;
