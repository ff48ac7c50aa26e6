//! Virtual clocks for running sessions and refresh loops under Turmoil.

use std::time::{Duration, Instant};

use rotor_core::env::Environment;

/// Clock pair backed by Turmoil's simulated time.
///
/// `now()` is Turmoil's virtual instant, so sleeps complete instantly.
/// `unix_time_ms()` starts at a fixed epoch and moves in lockstep with
/// virtual time, which pins window boundaries to the same virtual instants
/// on every run.
///
/// Construct it inside a simulated host; the wall clock is anchored to the
/// virtual instant of construction.
#[derive(Clone, Debug)]
pub struct SimEnv {
    epoch_ms: u64,
    origin: Instant,
}

impl SimEnv {
    /// Wall-clock origin used by [`SimEnv::new`]: 2023-11-14T22:13:20Z, a
    /// multiple of every interval up to 100 000 seconds.
    pub const DEFAULT_EPOCH_MS: u64 = 1_700_000_000_000;

    /// Create a SimEnv whose wall clock starts at [`Self::DEFAULT_EPOCH_MS`].
    pub fn new() -> Self {
        Self::starting_at(Self::DEFAULT_EPOCH_MS)
    }

    /// Create a SimEnv whose wall clock reads `epoch_ms` now.
    ///
    /// Use this to start a test a known distance before a window boundary.
    pub fn starting_at(epoch_ms: u64) -> Self {
        Self { epoch_ms, origin: tokio::time::Instant::now().into_std() }
    }

    /// Virtual time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        self.now() - self.origin
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now().into_std()
    }

    fn unix_time_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.epoch_ms.saturating_add(elapsed)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
