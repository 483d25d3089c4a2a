//! Synchronizer Configuration Settings
//!
//! Configuration for the synchronization client, loaded from environment
//! variables. Only the backend base URL is required; everything else has a
//! sensible default.

use std::time::Duration;

/// Path of the stream endpoint relative to the backend base URL.
const STREAM_PATH: &str = "/api/ws";

/// Stream connection settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Interval between keepalive pings.
    pub ping_interval: Duration,
    /// How long an unanswered ping may stay outstanding.
    pub pong_timeout: Duration,
    /// Delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(60),
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 0, // Unlimited
        }
    }
}

/// HTTP client settings for the dashboard REST API.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Complete synchronizer configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Dashboard backend base URL (`http://` or `https://`).
    pub base_url: String,
    /// Stream connection settings.
    pub stream: StreamSettings,
    /// HTTP client settings.
    pub http: HttpSettings,
    /// Retained message log capacity.
    pub log_capacity: usize,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl SyncConfig {
    /// Create a configuration with defaults for everything but the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not carry an `http` or `https`
    /// scheme.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        validate_base_url(&base_url)?;
        Ok(Self {
            base_url,
            stream: StreamSettings::default(),
            http: HttpSettings::default(),
            log_capacity: crate::domain::log::DEFAULT_LOG_CAPACITY,
            metrics_port: 9464,
        })
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `TOKEN_SYNC_BASE_URL` is missing, empty, or not
    /// an `http`/`https` URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("TOKEN_SYNC_BASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("TOKEN_SYNC_BASE_URL".to_string()))?;

        if base_url.is_empty() {
            return Err(ConfigError::EmptyValue("TOKEN_SYNC_BASE_URL".to_string()));
        }

        let mut config = Self::new(base_url)?;

        config.stream = StreamSettings {
            ping_interval: parse_env_duration_secs(
                "TOKEN_SYNC_PING_INTERVAL_SECS",
                StreamSettings::default().ping_interval,
            ),
            pong_timeout: parse_env_duration_secs(
                "TOKEN_SYNC_PONG_TIMEOUT_SECS",
                StreamSettings::default().pong_timeout,
            ),
            reconnect_delay: parse_env_duration_secs(
                "TOKEN_SYNC_RECONNECT_DELAY_SECS",
                StreamSettings::default().reconnect_delay,
            ),
            max_reconnect_attempts: parse_env_u32(
                "TOKEN_SYNC_MAX_RECONNECT_ATTEMPTS",
                StreamSettings::default().max_reconnect_attempts,
            ),
        };

        config.http = HttpSettings {
            timeout: parse_env_duration_secs(
                "TOKEN_SYNC_HTTP_TIMEOUT_SECS",
                HttpSettings::default().timeout,
            ),
        };

        config.log_capacity =
            parse_env_usize("TOKEN_SYNC_LOG_CAPACITY", config.log_capacity);
        config.metrics_port = parse_env_u16("TOKEN_SYNC_METRICS_PORT", config.metrics_port);

        Ok(config)
    }

    /// Get the WebSocket endpoint derived from the base URL.
    ///
    /// The scheme is swapped (`http` to `ws`, `https` to `wss`) and the
    /// fixed stream path is appended.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let swapped = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            // new() rejects other schemes, keep the URL as-is
            self.base_url.clone()
        };
        format!("{}{STREAM_PATH}", swapped.trim_end_matches('/'))
    }

    /// Get the REST API base URL without a trailing slash.
    #[must_use]
    pub fn api_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            var: "TOKEN_SYNC_BASE_URL".to_string(),
            reason: "expected an http:// or https:// URL".to_string(),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has an unusable value.
    #[error("environment variable {var} is invalid: {reason}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// What was wrong with it.
        reason: String,
    },
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}
