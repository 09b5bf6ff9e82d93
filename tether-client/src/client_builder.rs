//! Client builder for configuring reconnection and other options
//!
//! The `ClientBuilder` provides a fluent API for configuring client behavior
//! before connecting. It allows you to:
//! - Override any [`ClientConfig`] setting
//! - Replace the reconnection strategy or disable reconnection
//! - Plug in a different transport [`Connector`]
//! - Configure observability (OpenTelemetry)
//!
//! # Examples
//!
//! ```rust,no_run
//! use tether_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> tether_core::Result<()> {
//! let client = ClientBuilder::new("ws://localhost:5001")
//!     .with_max_reconnect_attempts(5)
//!     .with_request_timeout(Duration::from_secs(3))
//!     .connect()
//!     .await?;
//!
//! // With observability
//! let monitored = ClientBuilder::new("ws://localhost:5001")
//!     .with_default_observability()
//!     .service_name("spectrum-dashboard")
//!     .build()?;
//! # let _ = (client, monitored);
//! # Ok(())
//! # }
//! ```

use crate::client::ChannelClient;
use crate::config::ClientConfig;
use crate::metrics::ClientMetrics;
use crate::reconnect::{NoReconnect, ReconnectionStrategy};
use crate::transport::{Connector, WebSocketConnector};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{Error, ObservabilityConfig, Result};

/// Builder for configuring and creating a [`ChannelClient`]
pub struct ClientBuilder {
    config: ClientConfig,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    connector: Option<Arc<dyn Connector>>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a builder with default settings for `address`
    pub fn new(address: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(address))
    }

    /// Start from a complete configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            reconnect_strategy: None,
            connector: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// Replace the whole configuration, keeping the builder's address
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        let address = std::mem::take(&mut self.config.address);
        self.config = ClientConfig { address, ..config };
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = attempts;
        self
    }

    /// Set the first reconnection delay and the delay ceiling
    pub fn with_reconnect_delay(mut self, base: Duration, max: Duration) -> Self {
        self.config.base_reconnect_delay = base;
        self.config.max_reconnect_delay = max;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the probe interval and how long to wait for a pong
    pub fn with_keepalive(mut self, interval: Duration, response_wait: Duration) -> Self {
        self.config.keepalive_interval = interval;
        self.config.keepalive_response_wait = response_wait;
        self
    }

    pub fn with_dead_connection_threshold(mut self, threshold: Duration) -> Self {
        self.config.dead_connection_threshold = threshold;
        self
    }

    /// Default timeout used by [`ChannelClient::request`]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Use a custom reconnection strategy instead of the configured backoff
    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.reconnect_strategy = Some(strategy);
        self
    }

    /// Disable automatic reconnection
    pub fn without_reconnect(mut self) -> Self {
        self.reconnect_strategy = Some(Box::new(NoReconnect));
        self
    }

    /// Use a custom transport
    pub fn with_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Create the client without connecting
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Result<ChannelClient> {
        self.config.validate()?;

        // Initialize observability if configured
        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            tether_core::init_observability(config.clone()).map_err(|e| {
                Error::Internal(format!("Failed to initialize observability: {}", e))
            })?;

            Some(Arc::new(ClientMetrics::new(config.service_name)))
        } else {
            None
        };

        let strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(self.config.backoff()));
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WebSocketConnector));

        Ok(ChannelClient::new(self.config, connector, strategy, metrics))
    }

    /// Create the client and start connecting
    ///
    /// Returns as soon as the first attempt is under way; watch the
    /// `connected` event to learn when it opens.
    pub async fn connect(self) -> Result<ChannelClient> {
        let client = self.build()?;
        client.connect().await;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::FixedDelay;

    #[test]
    fn test_builder_creation() {
        let builder = ClientBuilder::new("ws://localhost:5001");
        assert_eq!(builder.config.address, "ws://localhost:5001");
        assert!(builder.reconnect_strategy.is_none());
        assert!(builder.connector.is_none());
        assert!(builder.observability_config.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let builder = ClientBuilder::new("ws://localhost:5001")
            .with_max_reconnect_attempts(3)
            .with_reconnect_delay(Duration::from_millis(200), Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(2))
            .with_keepalive(Duration::from_secs(15), Duration::from_secs(2))
            .with_dead_connection_threshold(Duration::from_secs(20))
            .with_request_timeout(Duration::from_secs(1));

        let config = &builder.config;
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.base_reconnect_delay, Duration::from_millis(200));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.keepalive_interval, Duration::from_secs(15));
        assert_eq!(config.keepalive_response_wait, Duration::from_secs(2));
        assert_eq!(config.dead_connection_threshold, Duration::from_secs(20));
        assert_eq!(config.request_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_with_config_keeps_address() {
        let config = ClientConfig {
            address: "ws://ignored:1".into(),
            max_reconnect_attempts: 7,
            ..Default::default()
        };
        let builder = ClientBuilder::new("ws://lab:5001").with_config(config);
        assert_eq!(builder.config.address, "ws://lab:5001");
        assert_eq!(builder.config.max_reconnect_attempts, 7);
    }

    #[test]
    fn test_builder_with_reconnect() {
        let builder = ClientBuilder::new("ws://localhost:5001")
            .with_reconnect(Box::new(FixedDelay::new(Duration::from_secs(1)).with_max_attempts(2)));
        let strategy = builder.reconnect_strategy.as_ref().unwrap();
        assert_eq!(strategy.max_attempts(), 2);

        let builder = builder.without_reconnect();
        let strategy = builder.reconnect_strategy.as_ref().unwrap();
        assert_eq!(strategy.next_delay(1), None);
    }

    #[test]
    fn test_builder_with_observability() {
        let builder = ClientBuilder::new("ws://localhost:5001")
            .with_default_observability()
            .service_name("test-service");
        assert!(builder.observability_config.is_some());
        assert_eq!(builder.service_name, Some("test-service".to_string()));
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let result = ClientBuilder::new("  ").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_build_starts_closed() {
        let client = ClientBuilder::new("ws://127.0.0.1:1").build().unwrap();
        assert_eq!(client.state().await, crate::ConnectionState::Closed);
        assert_eq!(client.config().max_reconnect_attempts, 10);
        assert_eq!(client.address().await, "ws://127.0.0.1:1");
    }
}
