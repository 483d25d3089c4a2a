//! Reconnection Policy
//!
//! Decides how long to wait between connection attempts. The dashboard
//! stream uses a fixed five second interval with no attempt cap, so a
//! restarting backend picks the client back up without operator action.
//! The policy also supports multiplicative growth and jitter for
//! deployments that need them.

use std::time::Duration;

use rand::Rng;

/// Configuration for reconnection delays.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Growth factor applied to the delay after each attempt.
    pub multiplier: f64,
    /// Random jitter as a fraction of the delay (0.0 disables jitter).
    pub jitter_factor: f64,
    /// Maximum attempts before giving up (0 = retry forever).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    /// Fixed five second interval, retrying forever.
    fn default() -> Self {
        Self::fixed(Duration::from_secs(5))
    }
}

impl ReconnectConfig {
    /// Retry at a constant interval with no jitter, forever.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            jitter_factor: 0.0,
            max_attempts: 0,
        }
    }
}

/// Stateful reconnection delay generator.
///
/// Call [`next_delay`](Self::next_delay) before each attempt and
/// [`reset`](Self::reset) once a connection is established.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_delay: Duration,
    attempt_count: u32,
}

impl ReconnectPolicy {
    /// Create a policy from the given configuration.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        let current_delay = config.initial_delay;
        Self {
            config,
            current_delay,
            attempt_count: 0,
        }
    }

    /// Delay to wait before the next attempt, or `None` when the attempt
    /// budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts > 0 && self.attempt_count >= self.config.max_attempts {
            return None;
        }
        self.attempt_count += 1;

        let delay = self.apply_jitter(self.current_delay);
        self.current_delay = self.scaled_next();
        Some(delay)
    }

    /// Reset the delay and attempt counter after a successful connection.
    pub const fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.attempt_count = 0;
    }

    /// Attempts made since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Check whether another attempt is allowed.
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        self.config.max_attempts == 0 || self.attempt_count < self.config.max_attempts
    }

    fn scaled_next(&self) -> Duration {
        let max = self.config.max_delay;
        let scaled = self.current_delay.as_secs_f64() * self.config.multiplier;
        if !scaled.is_finite() || scaled <= 0.0 || scaled >= max.as_secs_f64() {
            return max;
        }
        Duration::from_secs_f64(scaled)
    }

    fn apply_jitter(&self, base: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return base;
        }
        let base_secs = base.as_secs_f64();
        let spread = base_secs * self.config.jitter_factor;
        let mut rng = rand::rng();
        let offset: f64 = rng.random_range(-spread..=spread);
        // Never sleep zero, a tight reconnect loop hammers the server
        Duration::from_secs_f64((base_secs + offset).max(0.001))
    }
}
