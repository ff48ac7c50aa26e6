//! Error types for the rotor wire format.
//!
//! All errors are structured, testable, and provide actionable information.

use thiserror::Error;

/// Protocol-level errors that can occur while encoding or decoding messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Incoming text was not valid JSON for any known message shape
    #[error("failed to decode message: {0}")]
    Decode(String),

    /// Outgoing message could not be serialized
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// Message is missing the `msg` discriminator entirely
    #[error("message has no `msg` discriminator")]
    MissingKind,

    /// Message is valid JSON but not an object
    #[error("message is not a JSON object")]
    NotAnObject,

    /// A request id on the wire was not a decimal integer
    #[error("invalid request id: {0:?}")]
    InvalidRequestId(String),
}

/// Convenient Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
