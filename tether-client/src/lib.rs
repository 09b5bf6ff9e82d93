//! Resilient real-time channel client
//!
//! This crate keeps a persistent, message-oriented connection to a backend
//! alive across network interruptions. It includes:
//!
//! - **Lifecycle state machine**: `Closed`, `Connecting`, `Open`, `Closing`
//! - **Auto-Reconnection**: exponential backoff with an attempt cap
//! - **Keepalive**: `ping`/`pong` probes and dead-connection detection
//! - **Outbound Queue**: messages sent while disconnected are flushed in order
//! - **Event Dispatcher**: lifecycle and per-type message events with
//!   subscriber failure isolation
//! - **Request-Response**: correlated requests with deadlines
//! - **Observability**: OpenTelemetry metrics and `tracing` logs
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tether_client::{ChannelClient, EventName, OutboundMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChannelClient::builder("ws://localhost:5001").build()?;
//!
//!     client
//!         .subscribe(EventName::Connected, |event| async move {
//!             println!("connected: {}", event.to_json());
//!         })
//!         .await;
//!     client
//!         .on_message("spectrum", |message| async move {
//!             println!("bins: {:?}", message.get("bins"));
//!         })
//!         .await;
//!
//!     client.connect().await;
//!
//!     // Queued until the connection opens
//!     client
//!         .send(OutboundMessage::new("set_gain").with_payload(json!({"db": 12})))
//!         .await;
//!
//!     let status = client.request("get_status", json!({})).await?;
//!     println!("status: {:?}", status.record());
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Custom Reconnection
//!
//! ```rust,no_run
//! use tether_client::{ClientBuilder, ExponentialBackoff};
//! use std::time::Duration;
//!
//! # async fn example() -> tether_core::Result<()> {
//! let client = ClientBuilder::new("ws://localhost:5001")
//!     .with_reconnect(Box::new(
//!         ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(30))
//!             .with_max_attempts(20)
//!             .with_jitter(),
//!     ))
//!     .connect()
//!     .await?;
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

mod client;
mod client_builder;
mod config;
mod connection_state;
mod dispatcher;
mod event;
mod keepalive;
mod metrics;
mod queue;
mod reconnect;
mod request;
mod transport;

pub use client::{ChannelClient, ClientDebugInfo};
pub use client_builder::ClientBuilder;
pub use config::{ClientConfig, DEFAULT_ADDRESS, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
pub use connection_state::{ClientStats, ConnectionState};
pub use dispatcher::{EventDispatcher, ListenerFn, SubscriptionId};
pub use event::{
    ConnectedEvent, DisconnectedEvent, ErrorEvent, ErrorPhase, Event, EventName, ExhaustedEvent,
    ReconnectingEvent,
};
pub use keepalive::KeepaliveMonitor;
pub use metrics::ClientMetrics;
pub use queue::OutboundQueue;
pub use reconnect::{ExponentialBackoff, FixedDelay, NoReconnect, ReconnectionStrategy};
pub use request::RequestManager;
pub use transport::{
    CloseInfo, Connector, TransportEvent, TransportHandle, WebSocketConnector, CLOSE_ABNORMAL,
    CLOSE_NORMAL,
};

// Re-export core types for convenience
pub use tether_core::{
    CorrelationId, Error, ErrorClass, InboundMessage, OutboundMessage, Result,
};
