//! Message shapes for both directions of the connection.
//!
//! Both enums are internally tagged on `msg`, so `ClientMessage::Sub { .. }`
//! encodes as `{"msg":"sub","name":..,"params":..,"id":".."}`. Both sides
//! derive `Serialize` and `Deserialize`: the client encodes
//! [`ClientMessage`] and decodes [`ServerMessage`], while the simulation
//! harness does the opposite when it plays the server.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{PROTOCOL_VERSION, RequestId, SUPPORTED_VERSIONS};

/// Messages sent from client to server.
///
/// # Security
///
/// - **Debug Redaction**: `method` and `sub` params may carry bearer
///   credentials (login attempts do). The `Debug` impl prints only the number
///   of params.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Protocol version negotiation, first message on a fresh connection
    Connect {
        /// Requested version
        version: String,
        /// Versions the client can speak, most preferred first
        support: Vec<String>,
    },

    /// Remote procedure call
    Method {
        /// Method name
        method: String,
        /// Positional arguments
        params: Vec<Value>,
        /// Correlation id echoed by the `result` reply
        id: RequestId,
    },

    /// Subscribe to a named publication
    Sub {
        /// Publication name
        name: String,
        /// Publication arguments
        params: Vec<Value>,
        /// Subscription id echoed by `ready`/`nosub`
        id: RequestId,
    },

    /// Keepalive reply, echoing the id of the server's `ping`
    Pong {
        /// Id copied from the ping, if it had one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

impl ClientMessage {
    /// Handshake message with the default version preferences.
    #[must_use]
    pub fn connect() -> Self {
        Self::Connect {
            version: PROTOCOL_VERSION.to_string(),
            support: SUPPORTED_VERSIONS.iter().map(|v| (*v).to_string()).collect(),
        }
    }

    /// RPC request.
    #[must_use]
    pub fn method(id: RequestId, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Method { method: method.into(), params, id }
    }

    /// Subscription request.
    #[must_use]
    pub fn sub(id: RequestId, name: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Sub { name: name.into(), params, id }
    }

    /// Keepalive reply to a ping carrying `id`.
    #[must_use]
    pub fn pong(id: Option<String>) -> Self {
        Self::Pong { id }
    }

    /// Wire name of this message kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Method { .. } => "method",
            Self::Sub { .. } => "sub",
            Self::Pong { .. } => "pong",
        }
    }

    /// Correlation id for `method` and `sub`, `None` otherwise.
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::Method { id, .. } | Self::Sub { id, .. } => Some(*id),
            Self::Connect { .. } | Self::Pong { .. } => None,
        }
    }
}

impl fmt::Debug for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { version, support } => f
                .debug_struct("Connect")
                .field("version", version)
                .field("support", support)
                .finish(),
            Self::Method { method, params, id } => f
                .debug_struct("Method")
                .field("method", method)
                .field("params", &format_args!("<{} params>", params.len()))
                .field("id", id)
                .finish(),
            Self::Sub { name, params, id } => f
                .debug_struct("Sub")
                .field("name", name)
                .field("params", &format_args!("<{} params>", params.len()))
                .field("id", id)
                .finish(),
            Self::Pong { id } => f.debug_struct("Pong").field("id", id).finish(),
        }
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Handshake accepted
    Connected {
        /// Server-assigned session identifier
        session: String,
    },

    /// Handshake rejected; `version` is the server's counter-proposal
    Failed {
        /// Version the server would accept
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },

    /// Reply to a `method` call
    Result {
        /// Id of the request this answers
        id: RequestId,
        /// Return value on success
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Error object on failure
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },

    /// A document entered a client-visible collection
    Added {
        /// Collection name
        collection: String,
        /// Document id
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Top-level document fields
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Map<String, Value>>,
    },

    /// Some top-level fields of a document changed
    Changed {
        /// Collection name
        collection: String,
        /// Document id
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Replaced top-level fields
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Map<String, Value>>,
        /// Removed top-level fields
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cleared: Option<Vec<String>>,
    },

    /// Initial data for the listed subscriptions has been sent
    Ready {
        /// Subscription ids
        #[serde(default)]
        subs: Vec<String>,
    },

    /// Subscription ended or was refused
    Nosub {
        /// Subscription id
        id: String,
        /// Reason, if refused
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },

    /// Writes performed by the listed methods are visible
    Updated {
        /// Method ids
        #[serde(default)]
        methods: Vec<String>,
    },

    /// Keepalive probe; must be answered with a `pong` carrying the same id
    Ping {
        /// Optional probe id
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Keepalive reply
    Pong {
        /// Optional probe id
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Connection-level error pushed by the server
    Error {
        /// Structured error payload
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
        /// Human-readable reason
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Any kind outside the modelled subset
    #[serde(other)]
    Unrecognized,
}

impl ServerMessage {
    /// Wire name of this message kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Failed { .. } => "failed",
            Self::Result { .. } => "result",
            Self::Added { .. } => "added",
            Self::Changed { .. } => "changed",
            Self::Ready { .. } => "ready",
            Self::Nosub { .. } => "nosub",
            Self::Updated { .. } => "updated",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::Error { .. } => "error",
            Self::Unrecognized => "unrecognized",
        }
    }
}
