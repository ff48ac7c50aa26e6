//! Locating the seed material inside server documents.
//!
//! The user document pushed by the server carries the identity list under
//! `profile.gestixiIds` and the issued token under `qrCodeTokens`. The token
//! container has been seen in three shapes, tried in this order:
//!
//! 1. **Nested**: `qrCodeTokens.arkose.hashed`, optionally with its own
//!    `qrCodeTokens.arkose.gestixiId` overriding the profile identity
//! 2. **Candidate list**: `qrCodeTokens` is an array; its first element is a
//!    token record (`{gestixiId, hashed}`) and is resolved on its own
//! 3. **Flat**: `qrCodeTokens.hashed`
//!
//! Resolution of a candidate never re-enters the container matcher, so
//! nesting is followed at most one level deep.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::ExtractionError;

const PROFILE_KEY: &str = "profile";
const IDENTITY_LIST_KEY: &str = "gestixiIds";
const CONTAINER_KEY: &str = "qrCodeTokens";
const NESTED_KEY: &str = "arkose";
const IDENTITY_KEY: &str = "gestixiId";
const SECRET_KEY: &str = "hashed";

/// Principal a code is generated for. Opaque, immutable once obtained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Wrap an identity string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The identity text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Previously issued token used as derivation input.
///
/// # Security
///
/// - **Debug Redaction**: `Debug` prints only the length. There is no
///   `Display` impl; use [`Secret::expose`] at the single place it is hashed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret for hashing.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(<redacted {} bytes>)", self.0.len())
    }
}

/// The (identity, secret) pair that seeds code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Who the code is for
    pub identity: Identity,
    /// What it is derived from
    pub secret: Secret,
}

impl Credentials {
    /// Build from raw strings.
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { identity: Identity::new(identity), secret: Secret::new(secret) }
    }
}

/// Shape of the token container, resolved by explicit case analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenContainer<'a> {
    /// `{ arkose: { hashed, gestixiId? } }`
    Nested(&'a Map<String, Value>),
    /// `[ record, .. ]`
    Candidate(&'a Value),
    /// `{ hashed }`
    Flat(&'a str),
    /// Missing, empty, or none of the above
    Absent,
}

impl<'a> TokenContainer<'a> {
    fn classify(container: Option<&'a Value>) -> Self {
        match container {
            Some(Value::Object(map)) => {
                if let Some(nested) = map.get(NESTED_KEY).and_then(Value::as_object) {
                    if non_empty_str(nested.get(SECRET_KEY)).is_some() {
                        return Self::Nested(nested);
                    }
                }
                match non_empty_str(map.get(SECRET_KEY)) {
                    Some(secret) => Self::Flat(secret),
                    None => Self::Absent,
                }
            },
            Some(Value::Array(items)) => match items.first() {
                Some(first) => Self::Candidate(first),
                None => Self::Absent,
            },
            _ => Self::Absent,
        }
    }
}

/// Extract credentials from the top-level fields of a user document.
///
/// # Errors
///
/// Returns an [`ExtractionError`] naming what was missing.
pub fn from_user_fields(fields: &Map<String, Value>) -> Result<Credentials, ExtractionError> {
    let profile_identity = fields
        .get(PROFILE_KEY)
        .and_then(|profile| profile.get(IDENTITY_LIST_KEY))
        .and_then(Value::as_array)
        .and_then(|ids| ids.first())
        .and_then(identity_text);

    let (identity, secret) = match TokenContainer::classify(fields.get(CONTAINER_KEY)) {
        TokenContainer::Nested(nested) => {
            let identity = nested.get(IDENTITY_KEY).and_then(identity_text).or(profile_identity);
            (identity, non_empty_str(nested.get(SECRET_KEY)).map(str::to_string))
        },
        TokenContainer::Candidate(record) => {
            let (identity, secret) = record_parts(record);
            (identity.or(profile_identity), secret)
        },
        TokenContainer::Flat(secret) => (profile_identity, Some(secret.to_string())),
        TokenContainer::Absent => (profile_identity, None),
    };

    pair(identity, secret)
}

/// Extract credentials from a standalone token record (`{gestixiId, hashed}`),
/// as returned directly by some method calls.
///
/// # Errors
///
/// Returns an [`ExtractionError`] naming what was missing.
pub fn from_token_record(record: &Value) -> Result<Credentials, ExtractionError> {
    let (identity, secret) = record_parts(record);
    pair(identity, secret)
}

/// Whether a value looks like a token record rather than a user document.
#[must_use]
pub fn is_token_record(value: &Value) -> bool {
    value.get(IDENTITY_KEY).is_some() || value.get(SECRET_KEY).is_some()
}

fn record_parts(record: &Value) -> (Option<String>, Option<String>) {
    let identity = record.get(IDENTITY_KEY).and_then(identity_text);
    let secret = non_empty_str(record.get(SECRET_KEY)).map(str::to_string);
    (identity, secret)
}

fn pair(identity: Option<String>, secret: Option<String>) -> Result<Credentials, ExtractionError> {
    match (identity, secret) {
        (Some(identity), Some(secret)) => Ok(Credentials::new(identity, secret)),
        (identity, secret) => {
            Err(ExtractionError::from_presence(identity.is_some(), secret.is_some()))
        },
    }
}

/// Largest float whose integral values are all exact.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Identities are strings on the wire, but numeric ids have been observed;
/// those are rendered in decimal. Integral floats drop the fraction, so
/// `4711.0` and `4711` name the same identity.
fn identity_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT => Some(format!("{f:.0}")),
            _ => Some(n.to_string()),
        },
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
