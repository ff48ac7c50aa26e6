//! Correlation ids for RPCs and subscriptions.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::errors::ProtocolError;

/// Identifier correlating a `method`/`sub` request with its reply.
///
/// Serialized as a decimal string (`"7"`), which is what DDP servers echo
/// back. Deserialization also tolerates bare JSON integers.
///
/// # Invariants
///
/// - Ids handed out by a session start at 1 and strictly increase in send
///   order. Replies may arrive in any order, so ids are compared by equality
///   only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// First id handed out by a fresh session.
    pub const FIRST: RequestId = RequestId(1);

    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Parse the wire representation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequestId` if `text` is not a decimal `u64`.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        text.parse::<u64>()
            .map(Self)
            .map_err(|_| ProtocolError::InvalidRequestId(text.to_string()))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => RequestId::parse(&text).map_err(de::Error::custom),
            Raw::Number(n) => Ok(RequestId(n)),
        }
    }
}
