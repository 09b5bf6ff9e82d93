//! Client configuration
//!
//! [`ClientConfig`] gathers every tunable of the channel client. It can be
//! built in code, deserialized from JSON (durations in milliseconds), or read
//! from environment variables on top of the defaults:
//!
//! - `TETHER_ADDRESS`: backend address
//! - `TETHER_RECONNECT_ATTEMPTS`: reconnection attempt cap
//! - `TETHER_RECONNECT_DELAY_MS`: first reconnection delay
//!
//! The JSON form also accepts the key names used by the browser dashboard
//! configuration (`websocket_url`, `reconnect_attempts`, `reconnect_delay`).
//!
//! ```rust
//! use tether_client::ClientConfig;
//!
//! let config = ClientConfig::from_json(
//!     r#"{"websocket_url": "ws://spectrum.local:5001", "reconnect_attempts": 5}"#,
//! )
//! .unwrap();
//! assert_eq!(config.address, "ws://spectrum.local:5001");
//! assert_eq!(config.max_reconnect_attempts, 5);
//! ```

use crate::keepalive;
use crate::reconnect::{self, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tether_core::{duration_ms, Error, Result};

/// Default backend address
pub const DEFAULT_ADDRESS: &str = "ws://localhost:5001";

/// Default time allowed for a transport to open
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for `request`
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for a channel client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend address, e.g. `ws://localhost:5001`
    #[serde(alias = "websocket_url")]
    pub address: String,

    /// Reconnection attempts before giving up
    #[serde(alias = "reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Delay before the first reconnection attempt; doubles on each attempt
    #[serde(alias = "reconnect_delay", with = "duration_ms")]
    pub base_reconnect_delay: Duration,

    /// Upper bound for a single reconnection delay
    #[serde(with = "duration_ms")]
    pub max_reconnect_delay: Duration,

    /// Time allowed for a transport to open
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,

    #[serde(with = "duration_ms")]
    pub keepalive_interval: Duration,

    #[serde(with = "duration_ms")]
    pub keepalive_response_wait: Duration,

    /// Silence after which an open connection is considered dead
    #[serde(with = "duration_ms")]
    pub dead_connection_threshold: Duration,

    /// Deadline used by `request`
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            max_reconnect_attempts: reconnect::DEFAULT_MAX_ATTEMPTS,
            base_reconnect_delay: reconnect::DEFAULT_BASE_DELAY,
            max_reconnect_delay: reconnect::DEFAULT_MAX_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive_interval: keepalive::DEFAULT_INTERVAL,
            keepalive_response_wait: keepalive::DEFAULT_RESPONSE_WAIT,
            dead_connection_threshold: keepalive::DEFAULT_DEAD_AFTER,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Defaults with the given address
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Parse a JSON document; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `TETHER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(address) = lookup("TETHER_ADDRESS") {
            config.address = address;
        }
        if let Some(attempts) = lookup("TETHER_RECONNECT_ATTEMPTS") {
            config.max_reconnect_attempts = attempts.trim().parse().map_err(|_| {
                Error::Config(format!("TETHER_RECONNECT_ATTEMPTS is not a number: {}", attempts))
            })?;
        }
        if let Some(delay) = lookup("TETHER_RECONNECT_DELAY_MS") {
            let millis: u64 = delay.trim().parse().map_err(|_| {
                Error::Config(format!("TETHER_RECONNECT_DELAY_MS is not a number: {}", delay))
            })?;
            config.base_reconnect_delay = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::Config("address must not be empty".into()));
        }
        if self.base_reconnect_delay > self.max_reconnect_delay {
            return Err(Error::Config(format!(
                "base reconnect delay ({}ms) exceeds the maximum ({}ms)",
                self.base_reconnect_delay.as_millis(),
                self.max_reconnect_delay.as_millis()
            )));
        }
        for (name, value) in [
            ("connect_timeout", self.connect_timeout),
            ("keepalive_interval", self.keepalive_interval),
            ("request_timeout", self.request_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }
        Ok(())
    }

    /// The exponential backoff described by this configuration
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.base_reconnect_delay, self.max_reconnect_delay)
            .with_max_attempts(self.max_reconnect_attempts)
    }

    pub(crate) fn keepalive(&self) -> keepalive::KeepaliveMonitor {
        keepalive::KeepaliveMonitor::new(
            self.keepalive_interval,
            self.keepalive_response_wait,
            self.dead_connection_threshold,
        )
    }
}
