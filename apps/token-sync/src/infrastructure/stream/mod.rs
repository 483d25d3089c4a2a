//! Dashboard Stream Adapter
//!
//! WebSocket transport for the dashboard's live feed:
//!
//! - **client**: connection lifecycle, frame dispatch, control frames
//! - **codec**: JSON frame decoding (tagged by a `type` field)
//! - **keepalive**: ping/pong liveness tracking
//! - **reconnect**: fixed-interval retry policy

pub mod client;
pub mod codec;
pub mod keepalive;
pub mod messages;
pub mod reconnect;

pub use client::{StreamClient, StreamClientConfig, StreamClientError, StreamEvent};
pub use codec::{CodecError, JsonCodec};
pub use keepalive::{Keepalive, KeepaliveConfig, KeepaliveTick};
pub use messages::{ControlAction, ControlRequest, StreamMessage, TokenTradeMessage};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
