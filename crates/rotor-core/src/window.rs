//! Mapping wall-clock time onto refresh windows.
//!
//! Time is cut into fixed slices of `interval` seconds, aligned to the Unix
//! epoch. A window is named by its *end* second, the boundary the remote
//! verifier hashes:
//!
//! ```text
//! bucket         = floor(t_ms / interval_ms)
//! window_start   = bucket * interval_ms
//! boundary_secs  = bucket * interval_secs + interval_secs
//! remaining_ms   = boundary_secs * 1000 - t_ms        (0 < remaining <= interval)
//! ```
//!
//! Timestamps are expected to be realistic epoch milliseconds. Arithmetic
//! saturates rather than wrapping for values near `u64::MAX`.

use std::{fmt, num::NonZeroU64, time::Duration};

use crate::error::ConfigError;

/// Length of one refresh window, in whole seconds.
///
/// Whole seconds keep `boundary_secs` an exact multiple of the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefreshInterval(NonZeroU64);

impl RefreshInterval {
    /// Ten seconds, the cadence the verifier expects.
    pub const DEFAULT: RefreshInterval = match NonZeroU64::new(10) {
        Some(secs) => RefreshInterval(secs),
        None => unreachable!(),
    };

    /// Interval of `secs` seconds.
    ///
    /// # Errors
    ///
    /// Returns `ZeroInterval` when `secs` is zero.
    pub fn from_secs(secs: u64) -> Result<Self, ConfigError> {
        NonZeroU64::new(secs).map(Self).ok_or(ConfigError::ZeroInterval)
    }

    /// Interval in seconds.
    #[must_use]
    pub fn as_secs(self) -> u64 {
        self.0.get()
    }

    /// Interval in milliseconds.
    #[must_use]
    pub fn as_millis(self) -> u64 {
        self.0.get().saturating_mul(1000)
    }

    /// Interval as a `Duration`.
    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0.get())
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for RefreshInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Which window to compute for a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowMode {
    /// The window containing the timestamp
    Current,
    /// The window after it, for pre-generating the upcoming code
    Next,
}

/// One refresh window.
///
/// # Invariants
///
/// - `boundary_secs` is a multiple of the interval length
/// - `window_start_ms + interval_ms == boundary_secs * 1000`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    /// Unix second marking the end of the window; the value that is hashed
    pub boundary_secs: u64,
    /// Unix millisecond at which the window starts
    pub window_start_ms: u64,
}

impl TimeWindow {
    /// Unix millisecond at which the window ends (exclusive).
    #[must_use]
    pub fn end_ms(&self) -> u64 {
        self.boundary_secs.saturating_mul(1000)
    }

    /// Whether `timestamp_ms` falls inside this window.
    #[must_use]
    pub fn contains(&self, timestamp_ms: u64) -> bool {
        self.window_start_ms <= timestamp_ms && timestamp_ms < self.end_ms()
    }
}

/// A window together with the time left in it at the sampled instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSample {
    /// The window
    pub window: TimeWindow,
    /// Milliseconds from the sampled instant to the window end
    pub remaining_ms: u64,
}

/// Window containing `timestamp_ms`.
#[must_use]
pub fn window_for(interval: RefreshInterval, timestamp_ms: u64) -> WindowSample {
    let interval_ms = interval.as_millis();
    let bucket = timestamp_ms / interval_ms;
    let window_start_ms = bucket.saturating_mul(interval_ms);
    let boundary_secs =
        bucket.saturating_mul(interval.as_secs()).saturating_add(interval.as_secs());
    let remaining_ms = boundary_secs.saturating_mul(1000).saturating_sub(timestamp_ms);

    debug_assert!(remaining_ms <= interval_ms);

    WindowSample { window: TimeWindow { boundary_secs, window_start_ms }, remaining_ms }
}

/// Window for `timestamp_ms` in the given mode.
///
/// `Next` windows the timestamp shifted forward by one interval, so
/// `remaining_ms` is the same as for `Current`; it is the window that
/// differs.
#[must_use]
pub fn window_for_mode(
    interval: RefreshInterval,
    mode: WindowMode,
    timestamp_ms: u64,
) -> WindowSample {
    let adjusted = match mode {
        WindowMode::Current => timestamp_ms,
        WindowMode::Next => timestamp_ms.saturating_add(interval.as_millis()),
    };
    window_for(interval, adjusted)
}
