//! # Rotor Protocol: Wire Format
//!
//! This crate implements the message layer spoken between the rotor client
//! and a DDP (Distributed Data Protocol) server.
//!
//! ## Protocol Design
//!
//! Every message is a single newline-free JSON object whose `msg` field
//! discriminates the kind:
//!
//! - **Client to server**: `connect`, `method`, `sub`, `pong`
//! - **Server to client**: `connected`, `failed`, `result`, `added`,
//!   `changed`, `ready`, `nosub`, `updated`, `ping`, `error`
//!
//! Only the subset of DDP actually needed to log in, subscribe to the user
//! document and call a handful of methods is modelled. Server kinds outside
//! that subset decode to [`ServerMessage::Unrecognized`] instead of failing,
//! so a chatty server cannot stall the session.
//!
//! ## Request Correlation
//!
//! RPCs and subscriptions carry a [`RequestId`]. On the wire DDP ids are
//! strings; we keep them as integers internally so that ordering is cheap
//! and the "strictly increasing from 1" invariant is checkable.
//!
//! ## Security Properties
//!
//! - **Explicit Schema**: Each message kind has an explicit Rust shape.
//!   Free-form server documents stay as [`serde_json::Value`] and are only
//!   interpreted by the extraction logic in `rotor-core`.
//! - **No Secrets in Debug**: Login parameters travel inside
//!   [`ClientMessage::Method`] params; callers must not log encoded messages
//!   at levels that are persisted.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod errors;
pub mod message;
pub mod request_id;

pub use codec::{decode_client, decode_server, encode_client, encode_server};
pub use errors::{ProtocolError, Result};
pub use message::{ClientMessage, ServerMessage};
pub use request_id::RequestId;

/// DDP protocol version requested in the `connect` handshake.
pub const PROTOCOL_VERSION: &str = "1";

/// Versions advertised as supported during the handshake, most preferred
/// first.
pub const SUPPORTED_VERSIONS: &[&str] = &["1", "pre2", "pre1"];
