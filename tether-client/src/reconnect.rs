//! Reconnection strategies for automatic reconnection
//!
//! When a connection closes without `close()` having been called, the client
//! asks its strategy what to do about the next attempt:
//! - how long to wait before trying again
//! - whether to give up
//!
//! Strategies are pure: the attempt counter lives in the client session, and
//! the strategy only maps a 1-based attempt number to a decision. The client
//! resets its counter after every successful connection.
//!
//! # Built-in Strategies
//!
//! - **ExponentialBackoff**: `min(base * 2^(attempt-1), max)` with an attempt cap
//! - **FixedDelay**: Constant delay between attempts
//! - **NoReconnect**: Never reconnect
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use tether_client::{ExponentialBackoff, ReconnectionStrategy};
//!
//! // Defaults: 1s base, 30s ceiling, 10 attempts, no jitter
//! let backoff = ExponentialBackoff::default();
//! assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(1000)));
//! assert_eq!(backoff.next_delay(3), Some(Duration::from_millis(4000)));
//! assert_eq!(backoff.next_delay(11), None);
//! ```

use std::time::Duration;

/// Default first retry delay
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default ceiling for a single retry delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Default number of attempts before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Trait for reconnection strategies
///
/// Implementations must not keep per-attempt state; the same attempt number
/// must always produce the same decision (jitter aside).
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before the given attempt
    ///
    /// `attempt` is 1 for the first reconnection after a disconnect.
    ///
    /// # Returns
    ///
    /// - `Some(duration)`: Wait this long, then attempt to connect
    /// - `None`: Give up
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// The attempt cap, reported in `reconnecting` and exhaustion events
    fn max_attempts(&self) -> u32;
}

/// Exponential backoff reconnection strategy with optional jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
    jitter: bool,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy with the default attempt cap
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            jitter: false,
        }
    }

    /// Set the maximum number of attempts before giving up
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Add a random 0-25% on top of every delay
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// The un-jittered delay for an attempt: `min(base * 2^(attempt-1), max)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let base_ms = self.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(factor);
        std::cmp::min(Duration::from_millis(delay_ms), self.max_delay)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt > self.max_attempts {
            return None;
        }

        let delay = self.delay_for(attempt);
        if !self.jitter {
            return Some(delay);
        }

        use rand::Rng;
        let delay_ms = delay.as_millis() as u64;
        let jitter_ms = rand::thread_rng().gen_range(0..=(delay_ms / 4));
        Some(Duration::from_millis(delay_ms + jitter_ms))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Fixed delay reconnection strategy
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: u32,
}

impl FixedDelay {
    /// Create a new fixed delay strategy with the default attempt cap
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the maximum number of attempts before giving up
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt <= self.max_attempts).then_some(self.delay)
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Strategy that never reconnects
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReconnect;

impl ReconnectionStrategy for NoReconnect {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        None
    }

    fn max_attempts(&self) -> u32 {
        0
    }
}
