//! Error types for tether
//!
//! A single [`Error`] enum covers every failure the channel client can report.
//! Variants carry plain strings rather than source errors so the enum stays
//! `Clone`: the same error value is handed to event subscribers and to the
//! caller waiting on a request.
//!
//! # Error Classes
//!
//! Each variant belongs to one [`ErrorClass`]:
//!
//! - **Transport**: connection-level failures, reported through the `error`
//!   event and never fatal on their own
//! - **Protocol**: malformed inbound payloads; the message is dropped and the
//!   connection is kept
//! - **Timeout**: establishment and request deadlines
//! - **Exhaustion**: the reconnection policy gave up
//! - **Request**: returned only to callers of request/response operations
//! - **Local**: serialization, configuration and internal faults
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use tether_core::{Error, ErrorClass};
//!
//! let error = Error::RequestTimeout {
//!     request_type: "get_snapshot".into(),
//!     timeout: Duration::from_millis(500),
//! };
//! assert_eq!(error.class(), ErrorClass::Timeout);
//! assert_eq!(error.to_string(), "Request timeout: get_snapshot");
//! ```

use std::time::Duration;
use thiserror::Error;

/// Result type for tether operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for tether operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// WebSocket transport layer error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Generic transport failure (connection refused, write failed, stream error)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Inbound payload could not be interpreted
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The transport did not open within the establishment timeout
    #[error("Connection timeout after {}ms", .0.as_millis())]
    ConnectTimeout(Duration),

    /// No response arrived before the request deadline
    #[error("Request timeout: {request_type}")]
    RequestTimeout {
        /// Type tag of the request that expired
        request_type: String,
        /// The deadline the request was given
        timeout: Duration,
    },

    /// The reconnection policy gave up
    #[error("Reconnection attempts exhausted: attempts={attempts}, max={max_attempts}")]
    Exhausted {
        /// Attempts made before giving up
        attempts: u32,
        /// The configured attempt cap
        max_attempts: u32,
    },

    /// A request could not be handed to the transport
    #[error("Failed to send request: {0}")]
    SendFailed(String),

    /// A request was abandoned before it settled
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// Connection was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Transport,
    Protocol,
    Timeout,
    Exhaustion,
    Request,
    Local,
}

impl Error {
    /// The class this error belongs to
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::WebSocket(_) | Error::Transport(_) | Error::ConnectionClosed => {
                ErrorClass::Transport
            }
            Error::Protocol(_) => ErrorClass::Protocol,
            Error::ConnectTimeout(_) | Error::RequestTimeout { .. } => ErrorClass::Timeout,
            Error::Exhausted { .. } => ErrorClass::Exhaustion,
            Error::SendFailed(_) | Error::Cancelled(_) => ErrorClass::Request,
            Error::Serialization(_) | Error::Config(_) | Error::Internal(_) => ErrorClass::Local,
        }
    }

    /// Whether this is one of the timeout variants
    pub fn is_timeout(&self) -> bool {
        self.class() == ErrorClass::Timeout
    }
}

impl ErrorClass {
    /// Stable lowercase name, used as a metric attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transport => "transport",
            ErrorClass::Protocol => "protocol",
            ErrorClass::Timeout => "timeout",
            ErrorClass::Exhaustion => "exhaustion",
            ErrorClass::Request => "request",
            ErrorClass::Local => "local",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
