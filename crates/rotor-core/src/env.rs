//! Clocks and sleeping, injected into drivers.
//!
//! Drivers never read a clock directly. Under Turmoil the virtual clock lets a
//! test walk through minutes of login staggering and window rollovers in no
//! real time; in production the same drivers run on the system clocks.
//!
//! # Hollow shell
//!
//! State machines in `rotor-core` hold no I/O. They:
//!
//! - MUST NOT call `std::time::Instant::now()`, `SystemTime::now()` or
//!   `tokio::time::sleep()`
//! - MUST receive wall-clock time as a parameter (`at_ms`)
//! - MUST express waiting as a returned timer action
//!
//! Two implementations exist:
//!
//! 1. `SimEnv` (rotor-harness): Turmoil virtual time, fixed wall-clock origin
//! 2. `SystemEnv` (rotor-client): real clocks
//!
//! # Invariants
//!
//! - `now()` never goes backwards
//! - Wall clock: `unix_time_ms()` advances in step with `now()` in simulation;
//!   in production it may jump (NTP), which only affects which window is
//!   current, never the timer table
//! - Isolation: implementations must not share global state

use std::time::Duration;

/// Abstract environment providing clocks and sleeping.
///
/// # Type Parameters
///
/// - `Instant`: a point on the monotonic clock. Drivers use it for timer
///   deadlines.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Type representing a point in monotonic time.
    ///
    /// Must support:
    /// - `Copy` - Lightweight to pass around
    /// - `Ord` - Can be compared (for deadline ordering)
    /// - `Sub<Output = Duration>` - Can compute elapsed time
    /// - `Add<Duration>` - Can compute deadlines
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + std::fmt::Debug
        + std::ops::Sub<Output = Duration>
        + std::ops::Add<Duration, Output = Self::Instant>;

    /// Returns the current monotonic time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: subsequent calls return times >= previous calls.
    fn now(&self) -> Self::Instant;

    /// Milliseconds since the Unix epoch.
    ///
    /// This is the clock the code windows are aligned to, and the one the
    /// remote verifier uses.
    fn unix_time_ms(&self) -> u64;

    /// Sleeps for the specified duration.
    ///
    /// # Behavior
    ///
    /// - Simulation: advances Turmoil's virtual time instantly
    /// - Production: yields to the Tokio scheduler for the duration
    ///
    /// Only drivers call this. State machines return timer actions instead.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Sleeps until `deadline`, returning immediately if it already passed.
    fn sleep_until(
        &self,
        deadline: Self::Instant,
    ) -> impl std::future::Future<Output = ()> + Send {
        let now = self.now();
        let remaining = if deadline > now { deadline - now } else { Duration::ZERO };
        self.sleep(remaining)
    }
}
