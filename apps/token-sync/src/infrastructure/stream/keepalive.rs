//! Connection Keepalive
//!
//! Liveness bookkeeping for one stream session. The session loop sends a
//! ping on a fixed interval; if the previous ping was never answered within
//! the timeout, the connection is considered dead and torn down so the
//! reconnect policy can take over. Any inbound traffic counts as proof of
//! life, not just pong frames.

use std::time::{Duration, Instant};

/// Configuration for connection keepalive.
#[derive(Debug, Clone)]
pub struct KeepaliveConfig {
    /// Interval between outbound pings.
    pub ping_interval: Duration,
    /// How long an unanswered ping may stay outstanding.
    pub pong_timeout: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(60),
        }
    }
}

/// Outcome of a keepalive interval tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveTick {
    /// Connection looks alive, send the next ping.
    SendPing,
    /// The previous ping went unanswered past the timeout.
    Timeout,
}

/// Per-session liveness state.
///
/// Owned mutably by the session loop; a new session starts fresh.
#[derive(Debug)]
pub struct Keepalive {
    config: KeepaliveConfig,
    last_pong: Instant,
    waiting_for_pong: bool,
}

impl Keepalive {
    /// Start tracking liveness for a freshly opened connection.
    #[must_use]
    pub fn new(config: KeepaliveConfig) -> Self {
        Self {
            config,
            last_pong: Instant::now(),
            waiting_for_pong: false,
        }
    }

    /// Record proof of life from any inbound frame.
    pub fn record_pong(&mut self) {
        self.last_pong = Instant::now();
        self.waiting_for_pong = false;
    }

    /// Evaluate liveness at a ping interval boundary.
    ///
    /// Returns [`KeepaliveTick::Timeout`] when the previous ping is still
    /// outstanding past the timeout, otherwise marks a new ping outstanding
    /// and returns [`KeepaliveTick::SendPing`].
    pub fn tick(&mut self) -> KeepaliveTick {
        if self.waiting_for_pong && self.last_pong.elapsed() > self.config.pong_timeout {
            return KeepaliveTick::Timeout;
        }
        self.waiting_for_pong = true;
        KeepaliveTick::SendPing
    }

    /// Time since the last proof of life.
    #[must_use]
    pub fn time_since_pong(&self) -> Duration {
        self.last_pong.elapsed()
    }
}
