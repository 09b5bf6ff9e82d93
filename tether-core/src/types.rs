//! Wire types for the tether channel
//!
//! Two kinds of frames travel over a channel:
//!
//! 1. **Control frames**: the bare strings `"ping"` and `"pong"`, used by the
//!    keepalive probe. They are never queued and never dispatched to
//!    subscribers.
//! 2. **Structured messages**: JSON objects carrying at least a `type` tag,
//!    a millisecond `timestamp`, and optionally a correlation `id`. All other
//!    keys are payload.
//!
//! Outbound messages are built as [`OutboundMessage`] (envelope + payload map)
//! and inbound ones are surfaced as [`InboundMessage`] (the full JSON record
//! with its envelope fields pre-extracted).
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use tether_core::OutboundMessage;
//!
//! let message = OutboundMessage::new("subscribe").with_payload(json!({"channel": "fft"}));
//! let record = message.to_record();
//! assert_eq!(record["type"], "subscribe");
//! assert_eq!(record["channel"], "fft");
//! ```

use serde::{de::DeserializeOwned, Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Type tag assigned to inbound objects that carry no `type`
pub const DEFAULT_MESSAGE_TYPE: &str = "message";

/// Type tag of correlated responses
pub const RESPONSE_TYPE: &str = "response";

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Correlation id linking a request to its response
///
/// Serialized as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Keepalive control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Ping,
    Pong,
}

impl Control {
    /// The literal text sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Control::Ping => "ping",
            Control::Pong => "pong",
        }
    }

    /// Recognize a control frame. Only exact matches count.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "ping" => Some(Control::Ping),
            "pong" => Some(Control::Pong),
            _ => None,
        }
    }
}

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Control(Control),
    Message(InboundMessage),
}

/// A structured message to be sent to the backend
///
/// The envelope fields (`type`, `id`, `timestamp`) always take precedence over
/// same-named keys in the payload when the record is built.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Type tag the backend dispatches on
    pub kind: String,
    /// Correlation id, set only for requests
    pub id: Option<CorrelationId>,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Remaining payload keys
    pub payload: Map<String, Value>,
}

impl OutboundMessage {
    /// Create a message with an empty payload, stamped with the current time
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            timestamp: timestamp_ms(),
            payload: Map::new(),
        }
    }

    /// Attach a correlation id
    pub fn with_id(mut self, id: CorrelationId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the payload
    ///
    /// An object becomes the payload map, `null` leaves it empty and any other
    /// value is wrapped as `{"data": value}`.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        self
    }

    /// Build a message from any serializable payload
    pub fn from_serializable<T: Serialize>(kind: impl Into<String>, payload: &T) -> Result<Self> {
        let value = serde_json::to_value(payload)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self::new(kind).with_payload(value))
    }

    /// Insert a single payload key
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The complete JSON record as it goes on the wire
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = self.payload.clone();
        record.insert("type".to_string(), Value::String(self.kind.clone()));
        if let Some(ref id) = self.id {
            record.insert("id".to_string(), Value::String(id.to_string()));
        }
        record.insert("timestamp".to_string(), Value::from(self.timestamp));
        record
    }
}

impl Serialize for OutboundMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

/// A structured message received from the backend
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    kind: String,
    id: Option<String>,
    timestamp: u64,
    record: Map<String, Value>,
}

impl InboundMessage {
    /// Wrap a decoded JSON object
    ///
    /// A missing or empty `type` becomes [`DEFAULT_MESSAGE_TYPE`]. A missing or
    /// null `timestamp` is filled in with `received_at`.
    pub fn from_record(mut record: Map<String, Value>, received_at: u64) -> Self {
        let kind = match record.get("type") {
            Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
            _ => DEFAULT_MESSAGE_TYPE.to_string(),
        };

        let id = match record.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };

        let timestamp = match record.get("timestamp") {
            None | Some(Value::Null) => {
                record.insert("timestamp".to_string(), Value::from(received_at));
                received_at
            }
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().map(|f| f as u64))
                .unwrap_or(received_at),
            Some(_) => received_at,
        };

        Self {
            kind,
            id,
            timestamp,
            record,
        }
    }

    /// Type tag used for dispatch
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Correlation id, if the message carries one
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Look up a single key of the record
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }

    /// The full record, envelope fields included
    pub fn record(&self) -> &Map<String, Value> {
        &self.record
    }

    pub fn into_record(self) -> Map<String, Value> {
        self.record
    }

    /// Deserialize the whole record into a typed struct
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.record.clone()))
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Serde helpers for `Duration` fields expressed in milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_envelope_wins_over_payload() {
        let message = OutboundMessage::new("get_x")
            .with_id("abc-1".into())
            .with_payload(json!({"type": "spoofed", "id": "other", "limit": 5}));
        let record = message.to_record();

        assert_eq!(record["type"], "get_x");
        assert_eq!(record["id"], "abc-1");
        assert_eq!(record["limit"], 5);
        assert_eq!(record["timestamp"], message.timestamp);
    }

    #[test]
    fn test_scalar_payload_is_wrapped() {
        let message = OutboundMessage::new("note").with_payload(json!("hello"));
        assert_eq!(message.payload["data"], "hello");

        let empty = OutboundMessage::new("note").with_payload(Value::Null);
        assert!(empty.payload.is_empty());
    }

    #[test]
    fn test_from_serializable() {
        #[derive(Serialize)]
        struct Window {
            start: u32,
            end: u32,
        }

        let message =
            OutboundMessage::from_serializable("set_window", &Window { start: 4, end: 9 }).unwrap();
        assert_eq!(message.payload["start"], 4);
        assert_eq!(message.payload["end"], 9);
    }

    #[test]
    fn test_inbound_defaults() {
        let message = InboundMessage::from_record(object(json!({"value": 1})), 1_700_000_000_000);
        assert_eq!(message.kind(), DEFAULT_MESSAGE_TYPE);
        assert_eq!(message.timestamp(), 1_700_000_000_000);
        assert_eq!(message.get("timestamp"), Some(&json!(1_700_000_000_000u64)));
        assert!(message.id().is_none());
    }

    #[test]
    fn test_inbound_keeps_sender_timestamp() {
        let message = InboundMessage::from_record(
            object(json!({"type": "spectrum", "timestamp": 42, "id": "r-7"})),
            99,
        );
        assert_eq!(message.kind(), "spectrum");
        assert_eq!(message.timestamp(), 42);
        assert_eq!(message.id(), Some("r-7"));
    }

    #[test]
    fn test_inbound_null_timestamp_is_replaced() {
        let message = InboundMessage::from_record(object(json!({"type": "x", "timestamp": null})), 7);
        assert_eq!(message.timestamp(), 7);
        assert_eq!(message.get("timestamp"), Some(&json!(7)));
    }

    #[test]
    fn test_inbound_deserialize() {
        #[derive(Deserialize)]
        struct Status {
            cpu: f64,
        }

        let message = InboundMessage::from_record(object(json!({"type": "status", "cpu": 0.5})), 1);
        let status: Status = message.deserialize().unwrap();
        assert_eq!(status.cpu, 0.5);
    }

    #[test]
    fn test_control_parse_is_exact() {
        assert_eq!(Control::parse("ping"), Some(Control::Ping));
        assert_eq!(Control::parse("pong"), Some(Control::Pong));
        assert_eq!(Control::parse("PING"), None);
        assert_eq!(Control::parse(" ping"), None);
    }
}
