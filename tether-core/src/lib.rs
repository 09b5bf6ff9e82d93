//! Core wire types and codec for tether
//!
//! This crate holds everything about a tether channel that does not depend on
//! a live connection:
//!
//! - **Types**: outbound and inbound messages, correlation ids, control frames
//! - **Codec**: text frame encoding and decoding
//! - **Error handling**: the shared [`Error`] enum and its classes
//! - **Observability**: logging and OpenTelemetry setup
//!
//! The `tether-client` crate builds the connection lifecycle, reconnection,
//! keepalive and request correlation on top of it.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use tether_core::{codec, CorrelationId, Frame, OutboundMessage};
//!
//! let request = OutboundMessage::new("get_snapshot")
//!     .with_id(CorrelationId::new("k2f9-1"))
//!     .with_payload(json!({"channel": 0}));
//! let text = codec::encode_message(&request).unwrap();
//!
//! let reply = r#"{"type":"response","id":"k2f9-1","bins":[0.1,0.4]}"#;
//! if let Frame::Message(message) = codec::decode(reply).unwrap() {
//!     assert_eq!(message.id(), Some("k2f9-1"));
//! }
//! # let _ = text;
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{Error, ErrorClass, Result};
pub use observability::{
    init_logging, init_observability, shutdown_observability, ObservabilityConfig,
};
pub use types::{
    duration_ms, timestamp_ms, Control, CorrelationId, Frame, InboundMessage, OutboundMessage,
    DEFAULT_MESSAGE_TYPE, RESPONSE_TYPE,
};
