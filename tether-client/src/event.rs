//! Events emitted by the channel client
//!
//! Lifecycle events have fixed names and typed payloads. Every inbound
//! structured message is also an event, named after its `type` tag.
//!
//! | name                              | payload               |
//! |-----------------------------------|-----------------------|
//! | `connected`                       | [`ConnectedEvent`]    |
//! | `disconnected`                    | [`DisconnectedEvent`] |
//! | `reconnecting`                    | [`ReconnectingEvent`] |
//! | `max_reconnect_attempts_reached`  | [`ExhaustedEvent`]    |
//! | `error`                           | [`ErrorEvent`]        |
//! | any inbound `type`                | [`InboundMessage`]    |
//!
//! Payload structs serialize with camelCase keys so they can be forwarded to
//! a UI unchanged.

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use tether_core::{duration_ms, Error, InboundMessage};

/// Name an event is subscribed and dispatched under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventName {
    Connected,
    Disconnected,
    Reconnecting,
    MaxReconnectAttemptsReached,
    Error,
    /// Inbound message with the given `type` tag
    Message(String),
}

impl EventName {
    /// Event name for an inbound message type
    pub fn message(kind: impl Into<String>) -> Self {
        EventName::Message(kind.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventName::Connected => "connected",
            EventName::Disconnected => "disconnected",
            EventName::Reconnecting => "reconnecting",
            EventName::MaxReconnectAttemptsReached => "max_reconnect_attempts_reached",
            EventName::Error => "error",
            EventName::Message(kind) => kind,
        }
    }

    /// Whether this names one of the fixed lifecycle events
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, EventName::Message(_))
    }

    /// The five lifecycle event names
    pub fn lifecycle() -> [EventName; 5] {
        [
            EventName::Connected,
            EventName::Disconnected,
            EventName::Reconnecting,
            EventName::MaxReconnectAttemptsReached,
            EventName::Error,
        ]
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an error was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPhase {
    /// Establishing the transport
    Connection,
    /// Reading from an open transport
    Transport,
    /// Decoding an inbound frame
    MessageParsing,
    /// Writing an outbound frame
    MessageSending,
}

impl ErrorPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorPhase::Connection => "connection",
            ErrorPhase::Transport => "transport",
            ErrorPhase::MessageParsing => "message_parsing",
            ErrorPhase::MessageSending => "message_sending",
        }
    }
}

impl fmt::Display for ErrorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    pub timestamp: u64,
    /// Cumulative reconnections during this client's lifetime
    pub reconnect_count: u64,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedEvent {
    pub timestamp: u64,
    /// Close code; 1006 for abnormal closes detected locally
    pub code: u16,
    pub reason: String,
    pub was_clean: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectingEvent {
    pub attempt: u32,
    pub max_attempts: u32,
    #[serde(with = "duration_ms")]
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhaustedEvent {
    pub attempts: u32,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub timestamp: u64,
    #[serde(serialize_with = "display")]
    pub error: Error,
    pub phase: ErrorPhase,
    /// The offending frame, for parse failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
}

fn display<S: Serializer>(error: &Error, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// An event delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected(ConnectedEvent),
    Disconnected(DisconnectedEvent),
    Reconnecting(ReconnectingEvent),
    MaxReconnectAttemptsReached(ExhaustedEvent),
    Error(ErrorEvent),
    Message(InboundMessage),
}

impl Event {
    /// The name this event is dispatched under
    pub fn name(&self) -> EventName {
        match self {
            Event::Connected(_) => EventName::Connected,
            Event::Disconnected(_) => EventName::Disconnected,
            Event::Reconnecting(_) => EventName::Reconnecting,
            Event::MaxReconnectAttemptsReached(_) => EventName::MaxReconnectAttemptsReached,
            Event::Error(_) => EventName::Error,
            Event::Message(message) => EventName::message(message.kind()),
        }
    }

    /// The inbound message, if this is a message event
    pub fn as_message(&self) -> Option<&InboundMessage> {
        match self {
            Event::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Payload as JSON
    pub fn to_json(&self) -> serde_json::Value {
        let value = match self {
            Event::Connected(e) => serde_json::to_value(e),
            Event::Disconnected(e) => serde_json::to_value(e),
            Event::Reconnecting(e) => serde_json::to_value(e),
            Event::MaxReconnectAttemptsReached(e) => serde_json::to_value(e),
            Event::Error(e) => serde_json::to_value(e),
            Event::Message(message) => {
                return serde_json::Value::Object(message.record().clone());
            }
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}
