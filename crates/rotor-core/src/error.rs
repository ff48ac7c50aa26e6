//! Error types for the rotor core.
//!
//! This module provides strongly-typed errors for the layers a session
//! touches:
//! - Configuration (credential and endpoint validation)
//! - Transport (connection-level failures)
//! - Protocol (malformed or unexpected messages)
//! - Server (errors pushed or returned by the peer)
//! - Extraction (user documents lacking the seed material)
//!
//! Whether an error ends the session is decided by [`SessionError::is_fatal`].

use rotor_proto::{ProtocolError, RequestId};
use thiserror::Error;

use crate::session::SessionState;

/// Rejected start parameters. Always fatal, reported before any I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Bearer credential is empty or whitespace
    #[error("bearer credential is empty")]
    MissingCredential,

    /// Endpoint is empty or whitespace
    #[error("endpoint is empty")]
    MissingEndpoint,

    /// Endpoint is not a parseable URL
    #[error("endpoint {endpoint:?} is not a valid URL: {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint
        endpoint: String,
        /// Parser message
        reason: String,
    },

    /// Endpoint URL does not use `ws` or `wss`
    #[error("endpoint scheme {0:?} is not ws or wss")]
    UnsupportedScheme(String),

    /// Refresh interval of zero seconds
    #[error("refresh interval must be at least one second")]
    ZeroInterval,
}

/// A user document did not carry both pieces of seed material.
///
/// Non-fatal: the session issues the repair call and keeps waiting.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionError {
    /// Secret found, identity missing
    #[error("identity not present in document")]
    MissingIdentity,

    /// Identity found, secret missing
    #[error("secret not present in document")]
    MissingSecret,

    /// Neither found
    #[error("neither identity nor secret present in document")]
    MissingBoth,
}

impl ExtractionError {
    /// Classify from what was found.
    ///
    /// Callers only construct an error when at least one piece is missing.
    #[must_use]
    pub fn from_presence(has_identity: bool, has_secret: bool) -> Self {
        match (has_identity, has_secret) {
            (true, _) => Self::MissingSecret,
            (false, true) => Self::MissingIdentity,
            (false, false) => Self::MissingBoth,
        }
    }
}

/// Errors surfaced by the session state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Start parameters rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connection-level failure, surfaced verbatim
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or unparseable message; the message is dropped
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error payload pushed or returned by the server after the handshake
    #[error("server error: {0}")]
    Server(String),

    /// Server refused the handshake (error or version mismatch)
    #[error("handshake rejected by server: {0}")]
    HandshakeRejected(String),

    /// Every staggered login attempt came back with an error
    #[error("all {attempts} login attempts were rejected")]
    LoginRejected {
        /// Number of attempts made
        attempts: usize,
    },

    /// User document lacked seed material
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Operation not valid in the current state
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// State when the operation was attempted
        state: SessionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Message kind not expected in the current state; the message is dropped
    #[error("unexpected {kind} message in state {state:?}")]
    UnexpectedMessage {
        /// State when the message arrived
        state: SessionState,
        /// Wire kind of the message
        kind: &'static str,
    },

    /// Reply for an id that has no outstanding request; the reply is dropped
    #[error("no outstanding request with id {0}")]
    UnmatchedReply(RequestId),
}

impl SessionError {
    /// Returns true if this error ends the session.
    ///
    /// Fatal errors move the session to `Failed` (or prevent it from
    /// starting). Everything else is reported and the session keeps going:
    /// a bad message is dropped, a server complaint after the handshake is
    /// surfaced, a document without seed material triggers the repair call.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Config(_)
                | SessionError::Transport(_)
                | SessionError::HandshakeRejected(_)
                | SessionError::LoginRejected { .. }
        )
    }
}
