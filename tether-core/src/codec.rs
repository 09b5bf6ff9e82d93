//! Codec for channel frames
//!
//! Encoding turns an [`OutboundMessage`] into its JSON text. Decoding
//! recognizes the `ping`/`pong` control strings first and otherwise expects a
//! JSON object; anything else is a protocol error that the caller reports
//! without dropping the connection.
//!
//! # Examples
//!
//! ```rust
//! use tether_core::{codec, Control, Frame};
//!
//! assert_eq!(codec::decode("ping").unwrap(), Frame::Control(Control::Ping));
//!
//! match codec::decode(r#"{"type":"spectrum","bins":[1,2,3]}"#).unwrap() {
//!     Frame::Message(message) => assert_eq!(message.kind(), "spectrum"),
//!     Frame::Control(_) => unreachable!(),
//! }
//!
//! assert!(codec::decode("[1,2,3]").is_err());
//! ```

use crate::error::{Error, Result};
use crate::types::{timestamp_ms, Control, Frame, InboundMessage, OutboundMessage};
use serde_json::Value;

/// Encode a structured message to JSON text
pub fn encode_message(message: &OutboundMessage) -> Result<String> {
    serde_json::to_string(message).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode a control frame
pub fn encode_control(control: Control) -> String {
    control.as_str().to_string()
}

/// Decode an inbound text frame, stamping messages with the current time
pub fn decode(text: &str) -> Result<Frame> {
    decode_at(text, timestamp_ms())
}

/// Decode an inbound text frame received at `received_at` (ms since epoch)
pub fn decode_at(text: &str, received_at: u64) -> Result<Frame> {
    if let Some(control) = Control::parse(text) {
        return Ok(Frame::Control(control));
    }

    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::Protocol(format!("invalid JSON: {}", e)))?;

    match value {
        Value::Object(record) => Ok(Frame::Message(InboundMessage::from_record(
            record,
            received_at,
        ))),
        other => Err(Error::Protocol(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
