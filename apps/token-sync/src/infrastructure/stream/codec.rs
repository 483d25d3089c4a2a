//! Stream Frame Codec
//!
//! Decodes JSON text frames from the dashboard stream into typed messages
//! and encodes outbound control frames. Frames with an unknown tag are kept
//! raw rather than rejected, so the message log sees everything the server
//! sent.

use serde::Serialize;
use thiserror::Error;

use super::messages::{StreamMessage, TokenTradeMessage};

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON serialization or deserialization failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame was not a JSON object.
    #[error("invalid frame format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the dashboard stream protocol.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text frame into a stream message.
    ///
    /// Dispatches on the `type` field: `newToken` and `tokenTrade` decode to
    /// typed messages, anything else is retained as [`StreamMessage::Other`].
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not valid JSON or not a JSON object.
    pub fn decode(&self, text: &str) -> Result<StreamMessage, CodecError> {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            let preview: String = trimmed.chars().take(50).collect();
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {preview}"
            )));
        }

        let value: serde_json::Value = serde_json::from_str(trimmed)?;
        let message = match value.get("type").and_then(|v| v.as_str()) {
            Some("newToken") => StreamMessage::NewToken,
            Some("tokenTrade") => {
                let trade: TokenTradeMessage = serde_json::from_value(value)?;
                StreamMessage::TokenTrade(trade)
            }
            _ => StreamMessage::Other(value),
        };
        Ok(message)
    }

    /// Encode an outbound frame to JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode<T: Serialize>(&self, message: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(message)?)
    }
}
