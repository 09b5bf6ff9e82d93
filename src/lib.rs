//! Tether - resilient real-time channel client
//!
//! This is the main convenience crate that re-exports the tether sub-crates.
//! Use this crate if you want a single dependency.
//!
//! # Architecture
//!
//! Tether is organized into modular crates:
//!
//! - **tether-core**: wire types, codec, error handling, observability
//! - **tether-client**: connection lifecycle, reconnection, keepalive,
//!   outbound queue, event dispatch and request correlation
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tether::{ChannelClient, EventName};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChannelClient::builder("ws://localhost:5001").build()?;
//!
//!     client
//!         .subscribe(EventName::Disconnected, |event| async move {
//!             eprintln!("lost connection: {}", event.to_json());
//!         })
//!         .await;
//!
//!     client.connect().await;
//!     let snapshot = client.request("get_snapshot", json!({})).await?;
//!     println!("{:?}", snapshot.record());
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Observability
//!
//! ```rust,no_run
//! use tether::ClientBuilder;
//!
//! # async fn example() -> tether::Result<()> {
//! let client = ClientBuilder::new("ws://localhost:5001")
//!     .with_default_observability()
//!     .service_name("spectrum-dashboard")
//!     .connect()
//!     .await?;
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

pub use tether_client as client;
pub use tether_core as core;

pub use tether_client::{
    ChannelClient, ClientBuilder, ClientConfig, ClientStats, ConnectionState, Event, EventName,
    ExponentialBackoff, ReconnectionStrategy,
};
pub use tether_core::{
    init_logging, init_observability, shutdown_observability, Error, InboundMessage,
    ObservabilityConfig, OutboundMessage, Result,
};
