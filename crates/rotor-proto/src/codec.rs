//! Text encoding of messages.
//!
//! One message per transport frame (WebSocket text frame, or one line on the
//! simulated TCP transport). `serde_json` never emits raw newlines in compact
//! mode, so encoded messages are safe to line-frame.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    ClientMessage, ServerMessage,
    errors::{ProtocolError, Result},
};

/// Encode a client message as compact JSON.
///
/// # Errors
///
/// Returns `Encode` if serialization fails.
pub fn encode_client(message: &ClientMessage) -> Result<String> {
    encode(message)
}

/// Encode a server message as compact JSON (simulation servers).
///
/// # Errors
///
/// Returns `Encode` if serialization fails.
pub fn encode_server(message: &ServerMessage) -> Result<String> {
    encode(message)
}

/// Decode a message received from the server.
///
/// # Errors
///
/// - `Decode` if `text` is not JSON or does not fit the shape its `msg`
///   names
/// - `NotAnObject` if `text` is JSON but not an object
/// - `MissingKind` if the object has no string `msg` field
pub fn decode_server(text: &str) -> Result<ServerMessage> {
    decode(text)
}

/// Decode a message received from a client (simulation servers).
///
/// # Errors
///
/// Same conditions as [`decode_server`]. Unknown client kinds are a
/// `Decode` error, there is no fallback variant on this side.
pub fn decode_client(text: &str) -> Result<ClientMessage> {
    decode(text)
}

fn encode<T: Serialize>(message: &T) -> Result<String> {
    serde_json::to_string(message).map_err(|e| ProtocolError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::Decode(e.to_string()))?;

    let Some(object) = value.as_object() else {
        return Err(ProtocolError::NotAnObject);
    };

    if !object.get("msg").is_some_and(Value::is_string) {
        return Err(ProtocolError::MissingKind);
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::Decode(e.to_string()))
}
