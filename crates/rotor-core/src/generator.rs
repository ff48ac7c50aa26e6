//! Code generator bound to one set of credentials.
//!
//! A [`CodeGenerator`] combines the window arithmetic with the digest
//! derivation. Its configuration (credentials, static key, interval) is set
//! at construction and never changes; the only mutable state is the
//! last-announced window boundary, used to emit exactly one notice per
//! window.

use std::fmt;

use crate::{
    env::Environment,
    extract::{Credentials, Identity},
    token,
    window::{self, RefreshInterval, TimeWindow, WindowMode},
};

/// Characters of a code included in window notices.
const NOTICE_PREVIEW_LEN: usize = 50;

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Static key mixed into every digest
    pub static_key: String,
    /// Window length
    pub interval: RefreshInterval,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            static_key: token::DEFAULT_STATIC_KEY.to_string(),
            interval: RefreshInterval::DEFAULT,
        }
    }
}

/// One generated code and the metadata describing it.
///
/// Every call produces a fresh value; nothing here is mutated afterwards.
///
/// # Security
///
/// - **Debug Redaction**: `derivation_input` embeds the secret, so `Debug`
///   prints only its length.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    /// The scannable code string
    pub code: String,
    /// Window the code belongs to
    pub window: TimeWindow,
    /// Milliseconds until the sampled window rolls over (never zero)
    pub remaining_ms: u64,
    /// Exact string that was hashed
    pub derivation_input: String,
    /// Lowercase hex SHA-256 of `derivation_input`
    pub digest: String,
    /// Unix millisecond the code was generated at
    pub generated_at_ms: u64,
    /// Unix millisecond at which `window` ends
    pub valid_until_ms: u64,
    /// Mode the code was generated in
    pub mode: WindowMode,
}

impl fmt::Debug for GeneratedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedCode")
            .field("code", &self.code)
            .field("window", &self.window)
            .field("remaining_ms", &self.remaining_ms)
            .field(
                "derivation_input",
                &format_args!("<redacted {} bytes>", self.derivation_input.len()),
            )
            .field("digest", &self.digest)
            .field("generated_at_ms", &self.generated_at_ms)
            .field("valid_until_ms", &self.valid_until_ms)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Emitted the first time a window boundary is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowNotice {
    /// Boundary of the new window
    pub boundary_secs: u64,
    /// Leading characters of the code, for logs
    pub preview: String,
}

impl fmt::Display for WindowNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "new code for window {}: {}...", self.boundary_secs, self.preview)
    }
}

/// Result of [`CodeGenerator::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// The code
    pub code: GeneratedCode,
    /// Present only for the first generation in a window
    pub notice: Option<WindowNotice>,
}

/// Generator bound to one (identity, secret, static key, interval) tuple.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    credentials: Credentials,
    config: GeneratorConfig,
    last_announced: Option<u64>,
}

impl CodeGenerator {
    /// Create a generator. Nothing has been announced yet.
    pub fn new(credentials: Credentials, config: GeneratorConfig) -> Self {
        Self { credentials, config, last_announced: None }
    }

    /// Identity codes are generated for.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.credentials.identity
    }

    /// Boundary of the most recently announced window.
    #[must_use]
    pub fn last_announced(&self) -> Option<u64> {
        self.last_announced
    }

    /// Compute the code for `at_ms` without touching notification state.
    ///
    /// Use this for display-only sampling such as countdowns.
    #[must_use]
    pub fn sample(&self, mode: WindowMode, at_ms: u64) -> GeneratedCode {
        let sample = window::window_for_mode(self.config.interval, mode, at_ms);
        let derivation_input = token::derivation_input(
            &self.config.static_key,
            self.credentials.secret.expose(),
            sample.window.boundary_secs,
        );
        let digest = token::digest_input(&derivation_input);
        let code = token::assemble_code(self.credentials.identity.as_str(), &digest);

        GeneratedCode {
            code,
            window: sample.window,
            remaining_ms: sample.remaining_ms,
            derivation_input,
            digest,
            generated_at_ms: at_ms,
            valid_until_ms: sample.window.end_ms(),
            mode,
        }
    }

    /// Milliseconds left in the window containing `at_ms`.
    #[must_use]
    pub fn remaining_ms(&self, at_ms: u64) -> u64 {
        window::window_for(self.config.interval, at_ms).remaining_ms
    }

    /// Generate the code for `at_ms`, announcing the window if it is new.
    ///
    /// Repeated calls within one window return the same code and announce
    /// nothing.
    pub fn generate(&mut self, mode: WindowMode, at_ms: u64) -> Generation {
        let code = self.sample(mode, at_ms);
        let boundary = code.window.boundary_secs;

        let notice = if self.last_announced == Some(boundary) {
            None
        } else {
            self.last_announced = Some(boundary);
            let preview: String = code.code.chars().take(NOTICE_PREVIEW_LEN).collect();

            tracing::info!(
                identity = %self.credentials.identity,
                boundary_secs = boundary,
                remaining_ms = code.remaining_ms,
                ?mode,
                "generated code for new window"
            );

            Some(WindowNotice { boundary_secs: boundary, preview })
        };

        Generation { code, notice }
    }

    /// Generate at the environment's current wall-clock time.
    pub fn generate_now<E: Environment>(&mut self, mode: WindowMode, env: &E) -> Generation {
        self.generate(mode, env.unix_time_ms())
    }
}
