//! Digest derivation and code assembly.
//!
//! The remote verifier recomputes the same digest from its copy of the
//! secret, so everything here must be bit-for-bit stable:
//!
//! ```text
//! input  = static_key || secret || decimal(boundary_secs) || static_key
//! digest = lowercase_hex(SHA-256(input))
//! code   = "{identity}-{digest}-arkose+"
//! ```

use sha2::{Digest, Sha256};

/// Static key mixed into every derivation.
///
/// Not a secret in the cryptographic sense; it namespaces the digest.
pub const DEFAULT_STATIC_KEY: &str = "paH3tGeqmugkUT5Ls";

/// Constant tag appended to every assembled code.
pub const CODE_SUFFIX: &str = "arkose+";

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Build the exact string that is hashed.
#[must_use]
pub fn derivation_input(static_key: &str, secret: &str, boundary_secs: u64) -> String {
    format!("{static_key}{secret}{boundary_secs}{static_key}")
}

/// Derive the lowercase hex digest for one window boundary.
#[must_use]
pub fn derive(static_key: &str, secret: &str, boundary_secs: u64) -> String {
    digest_input(&derivation_input(static_key, secret, boundary_secs))
}

/// Hash an already-built derivation input.
#[must_use]
pub fn digest_input(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Assemble the scannable code string.
#[must_use]
pub fn assemble_code(identity: &str, digest: &str) -> String {
    format!("{identity}-{digest}-{CODE_SUFFIX}")
}
