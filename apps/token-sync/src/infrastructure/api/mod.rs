//! Dashboard REST API Client
//!
//! Typed client for the dashboard backend's HTTP endpoints. The stream
//! carries deltas; this client supplies the full snapshots. Requests are
//! not retried here: a failed refresh is reported and the next structural
//! event triggers a fresh attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::ports::TokenSourcePort;
use crate::domain::token::{Token, TokenList};
use crate::infrastructure::config::SyncConfig;

// =============================================================================
// Error Types
// =============================================================================

/// Path segment in a validation error location (field name or array index).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocSegment {
    /// Object field name.
    Field(String),
    /// Array index.
    Index(u64),
}

/// One field-level issue from a validation error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Location path of the offending field.
    pub loc: Vec<LocSegment>,
    /// Human-readable message.
    pub msg: String,
    /// Machine-readable issue type.
    #[serde(rename = "type")]
    pub issue_type: String,
}

/// Errors returned by the dashboard API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request could not be sent or the connection failed.
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was rejected with field-level validation issues.
    #[error("validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),

    /// Any other non-success response.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

/// Validation error envelope returned by the backend.
#[derive(Debug, Deserialize)]
struct ValidationErrorBody {
    #[serde(default)]
    detail: Vec<ValidationIssue>,
}

// =============================================================================
// Response Types
// =============================================================================

/// Health probe response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Reported backend status, e.g. "ok".
    pub status: String,
}

// =============================================================================
// API Client
// =============================================================================

/// HTTP client for the dashboard REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client against the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from the synchronizer configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn from_config(config: &SyncConfig) -> Result<Self, ApiError> {
        Self::new(config.api_base_url(), config.http.timeout)
    }

    /// Probe backend health.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend is unhealthy.
    pub async fn check_health(&self) -> Result<HealthResponse, ApiError> {
        self.get("/_healthz").await
    }

    /// Fetch the full token collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn list_tokens(&self) -> Result<TokenList, ApiError> {
        self.get("/routes/tokens").await
    }

    /// Fetch one token by on-chain address.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown address and
    /// [`ApiError::Validation`] when the backend rejects the address shape.
    pub async fn token_details(&self, address: &str) -> Result<Token, ApiError> {
        self.get(&format!("/routes/tokens/{address}")).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;
            return serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, path, &body))
    }
}

/// Map a non-success response onto a typed error.
///
/// A 422 carries the backend's field-level validation issues; they are
/// surfaced structurally so callers can tell a bad request from a missing
/// resource.
fn classify_error(status: StatusCode, path: &str, body: &str) -> ApiError {
    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(path.to_string()),
        StatusCode::UNPROCESSABLE_ENTITY => {
            match serde_json::from_str::<ValidationErrorBody>(body) {
                Ok(parsed) if !parsed.detail.is_empty() => ApiError::Validation(parsed.detail),
                _ => ApiError::Status {
                    status: status.as_u16(),
                    body: body.to_string(),
                },
            }
        }
        _ => ApiError::Status {
            status: status.as_u16(),
            body: body.to_string(),
        },
    }
}

#[async_trait]
impl TokenSourcePort for ApiClient {
    async fn fetch_tokens(&self) -> Result<TokenList, ApiError> {
        self.list_tokens().await
    }
}
