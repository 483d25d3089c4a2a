//! Stream Wire Messages
//!
//! Wire types for the dashboard WebSocket stream. Every frame is a JSON
//! object tagged by a `type` field. The client consumes `newToken` and
//! `tokenTrade` frames and sends `subscribe`/`unsubscribe` control frames.

use serde::{Deserialize, Serialize};

use crate::domain::token::TradeDelta;

/// Inbound trade notification for a subscribed token.
///
/// # Wire Format (JSON)
///
/// ```json
/// {"type": "tokenTrade", "token": "7sPm...", "data": {"volume": 1250.5}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTradeMessage {
    /// Message type, always `tokenTrade`.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// On-chain address of the traded token.
    pub token: String,
    /// Delta payload. Unknown keys are ignored.
    pub data: TradeDelta,
}

/// Decoded inbound stream frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// A new token was indexed. The payload carries no usable detail; the
    /// collection is refetched over REST instead.
    NewToken,
    /// A trade happened on a subscribed token.
    TokenTrade(TokenTradeMessage),
    /// Frame with an unrecognized or missing tag, retained raw.
    Other(serde_json::Value),
}

impl StreamMessage {
    /// Tag used in logs and metrics.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::NewToken => "newToken",
            Self::TokenTrade(_) => "tokenTrade",
            Self::Other(_) => "other",
        }
    }
}

/// Action carried by an outbound control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    /// Start receiving trade events for a token.
    Subscribe,
    /// Stop receiving trade events for a token.
    Unsubscribe,
}

impl ControlAction {
    /// Action name as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

/// Outbound subscribe or unsubscribe control frame.
///
/// # Wire Format (JSON)
///
/// ```json
/// {"type": "subscribe", "token": "7sPm..."}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// Requested action.
    #[serde(rename = "type")]
    pub action: ControlAction,
    /// Token address the action applies to.
    pub token: String,
}

impl ControlRequest {
    /// Build a subscribe frame for a token.
    #[must_use]
    pub fn subscribe(token: impl Into<String>) -> Self {
        Self {
            action: ControlAction::Subscribe,
            token: token.into(),
        }
    }

    /// Build an unsubscribe frame for a token.
    #[must_use]
    pub fn unsubscribe(token: impl Into<String>) -> Self {
        Self {
            action: ControlAction::Unsubscribe,
            token: token.into(),
        }
    }
}
