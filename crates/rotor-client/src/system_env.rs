//! Production Environment backed by the system clocks.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rotor_core::env::Environment;

/// Real clocks: tokio's monotonic `Instant` for timers and `SystemTime` for
/// window alignment.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn unix_time_ms(&self) -> u64 {
        // A clock set before 1970 reads as the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn sleep_until(&self, deadline: Self::Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}
