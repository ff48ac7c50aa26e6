//! Refresh cadences.
//!
//! Once credentials are published, two timers run side by side:
//!
//! - **Countdown** (every 100ms by default): samples the remaining time for
//!   display. It only reads the generator and never touches its boundary
//!   notification state.
//! - **Regenerate**: produces the authoritative code. The first firing is
//!   `remaining_ms` after start, so it lands on the next window boundary.
//!   Every firing re-arms for the remainder of the wall-clock window it
//!   landed in, so a late or early firing never shifts later boundaries.
//!
//! Like the session, the scheduler is sans-IO: it returns [`RefreshAction`]s
//! and is told the wall-clock time on every call.

use std::{collections::BTreeSet, fmt, time::Duration};

use crate::{
    generator::{CodeGenerator, GeneratedCode, Generation, WindowNotice},
    window::WindowMode,
};

/// Scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Period of the display countdown
    pub countdown_period: Duration,
    /// Countdowns at or below this many whole seconds are urgent
    pub urgent_threshold_secs: u64,
    /// Window the regenerated codes are taken from
    pub mode: WindowMode,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            countdown_period: Duration::from_millis(100),
            urgent_threshold_secs: 2,
            mode: WindowMode::Current,
        }
    }
}

/// Scheduler timers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RefreshTimer {
    /// Display countdown tick
    Countdown,
    /// Authoritative regeneration
    Regenerate,
}

/// Remaining time formatted for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    /// Milliseconds until the window rolls over
    pub remaining_ms: u64,
    /// Whole seconds remaining are at or below the urgent threshold
    pub urgent: bool,
}

impl Countdown {
    /// Classify `remaining_ms` against `urgent_threshold_secs`.
    #[must_use]
    pub fn new(remaining_ms: u64, urgent_threshold_secs: u64) -> Self {
        Self { remaining_ms, urgent: remaining_ms / 1000 <= urgent_threshold_secs }
    }
}

impl fmt::Display for Countdown {
    /// `{seconds}.{tenths}s`, both truncated.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}s", self.remaining_ms / 1000, (self.remaining_ms % 1000) / 100)
    }
}

/// Actions returned by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshAction {
    /// Arm a one-shot timer, replacing any armed timer with the same key
    SetTimer {
        /// Timer key
        timer: RefreshTimer,
        /// Delay from now
        after: Duration,
    },
    /// Disarm a timer
    CancelTimer(RefreshTimer),
    /// Hand a fresh code to the renderer
    Render(GeneratedCode),
    /// Update the countdown display
    Countdown(Countdown),
    /// A new window started
    Notice(WindowNotice),
}

/// Drives a [`CodeGenerator`] on the two cadences.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    generator: CodeGenerator,
    config: SchedulerConfig,
    armed: BTreeSet<RefreshTimer>,
}

impl RefreshScheduler {
    /// Create a stopped scheduler.
    pub fn new(generator: CodeGenerator, config: SchedulerConfig) -> Self {
        Self { generator, config, armed: BTreeSet::new() }
    }

    /// The generator being driven
    #[must_use]
    pub fn generator(&self) -> &CodeGenerator {
        &self.generator
    }

    /// Whether any cadence is armed
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.armed.is_empty()
    }

    /// Generate the first code and arm both cadences.
    ///
    /// Calling `start` on a running scheduler restarts it.
    pub fn start(&mut self, now_ms: u64) -> Vec<RefreshAction> {
        let mut actions = self.regenerate(now_ms);
        let first_regeneration = match actions.first() {
            Some(RefreshAction::Render(code)) => code.remaining_ms,
            _ => self.generator.remaining_ms(now_ms),
        };

        actions.push(RefreshAction::Countdown(self.countdown(now_ms)));
        actions.push(self.arm(RefreshTimer::Countdown, self.config.countdown_period));
        actions.push(self.arm(RefreshTimer::Regenerate, Duration::from_millis(first_regeneration)));

        tracing::debug!(first_regeneration_ms = first_regeneration, "refresh scheduler started");
        actions
    }

    /// A timer armed by a `SetTimer` action fired. Disarmed timers are
    /// no-ops.
    pub fn on_timer(&mut self, timer: RefreshTimer, now_ms: u64) -> Vec<RefreshAction> {
        if !self.armed.remove(&timer) {
            tracing::trace!(?timer, "ignoring stale timer");
            return vec![];
        }

        match timer {
            RefreshTimer::Countdown => vec![
                RefreshAction::Countdown(self.countdown(now_ms)),
                self.arm(RefreshTimer::Countdown, self.config.countdown_period),
            ],
            RefreshTimer::Regenerate => {
                let next = Duration::from_millis(self.generator.remaining_ms(now_ms));

                let mut actions = self.regenerate(now_ms);
                actions.push(self.arm(RefreshTimer::Regenerate, next));
                actions
            },
        }
    }

    /// Disarm both cadences.
    pub fn stop(&mut self) -> Vec<RefreshAction> {
        std::mem::take(&mut self.armed).into_iter().map(RefreshAction::CancelTimer).collect()
    }

    /// Countdown as of `now_ms`, read without side effects.
    #[must_use]
    pub fn countdown(&self, now_ms: u64) -> Countdown {
        Countdown::new(self.generator.remaining_ms(now_ms), self.config.urgent_threshold_secs)
    }

    fn regenerate(&mut self, now_ms: u64) -> Vec<RefreshAction> {
        let Generation { code, notice } = self.generator.generate(self.config.mode, now_ms);

        let mut actions = vec![RefreshAction::Render(code)];
        actions.extend(notice.map(RefreshAction::Notice));
        actions
    }

    fn arm(&mut self, timer: RefreshTimer, after: Duration) -> RefreshAction {
        self.armed.insert(timer);
        RefreshAction::SetTimer { timer, after }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extract::Credentials, generator::GeneratorConfig, window::RefreshInterval};

    fn scheduler() -> RefreshScheduler {
        let generator = CodeGenerator::new(Credentials::new("g1", "h1"), GeneratorConfig {
            static_key: "K".to_string(),
            interval: RefreshInterval::DEFAULT,
        });
        RefreshScheduler::new(generator, SchedulerConfig::default())
    }

    fn rendered(actions: &[RefreshAction]) -> Vec<&GeneratedCode> {
        actions
            .iter()
            .filter_map(|a| match a {
                RefreshAction::Render(code) => Some(code),
                _ => None,
            })
            .collect()
    }

    fn timer_delay(actions: &[RefreshAction], wanted: RefreshTimer) -> Option<Duration> {
        actions.iter().find_map(|a| match a {
            RefreshAction::SetTimer { timer, after } if *timer == wanted => Some(*after),
            _ => None,
        })
    }

    #[test]
    fn start_renders_and_aligns_first_regeneration() {
        let mut scheduler = scheduler();
        let actions = scheduler.start(1_700_000_003_400);

        let codes = rendered(&actions);
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].remaining_ms, 6_600);
        assert!(actions.iter().any(|a| matches!(a, RefreshAction::Notice(_))));

        assert_eq!(
            timer_delay(&actions, RefreshTimer::Regenerate),
            Some(Duration::from_millis(6_600))
        );
        assert_eq!(
            timer_delay(&actions, RefreshTimer::Countdown),
            Some(Duration::from_millis(100))
        );
        assert!(scheduler.is_running());
    }

    #[test]
    fn regeneration_repeats_every_interval() {
        let mut scheduler = scheduler();
        scheduler.start(1_700_000_003_400);

        let actions = scheduler.on_timer(RefreshTimer::Regenerate, 1_700_000_010_000);
        let codes = rendered(&actions);
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].window.boundary_secs, 1_700_000_020);
        assert_eq!(
            timer_delay(&actions, RefreshTimer::Regenerate),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn countdown_does_not_announce_windows() {
        let mut scheduler = scheduler();
        scheduler.start(1_700_000_009_900);
        assert_eq!(scheduler.generator().last_announced(), Some(1_700_000_010));

        // Countdown crosses into the next window; only regeneration may
        // announce it.
        let actions = scheduler.on_timer(RefreshTimer::Countdown, 1_700_000_010_050);
        assert!(rendered(&actions).is_empty());
        assert!(!actions.iter().any(|a| matches!(a, RefreshAction::Notice(_))));
        assert_eq!(scheduler.generator().last_announced(), Some(1_700_000_010));

        let actions = scheduler.on_timer(RefreshTimer::Regenerate, 1_700_000_010_050);
        assert!(actions.iter().any(|a| matches!(a, RefreshAction::Notice(_))));
        assert_eq!(scheduler.generator().last_announced(), Some(1_700_000_020));
    }

    #[test]
    fn early_regeneration_realigns_to_boundary() {
        let mut scheduler = scheduler();
        scheduler.start(1_700_000_003_400);

        // Wall clock lags the monotonic timer by 5ms.
        let actions = scheduler.on_timer(RefreshTimer::Regenerate, 1_700_000_009_995);
        assert!(!actions.iter().any(|a| matches!(a, RefreshAction::Notice(_))));
        assert_eq!(
            timer_delay(&actions, RefreshTimer::Regenerate),
            Some(Duration::from_millis(5))
        );
    }

    #[test]
    fn late_regeneration_does_not_drift() {
        let mut scheduler = scheduler();
        scheduler.start(1_700_000_003_400);

        let actions = scheduler.on_timer(RefreshTimer::Regenerate, 1_700_000_010_007);
        assert_eq!(rendered(&actions)[0].window.boundary_secs, 1_700_000_020);
        assert_eq!(
            timer_delay(&actions, RefreshTimer::Regenerate),
            Some(Duration::from_millis(9_993))
        );

        // Lateness does not accumulate across firings.
        let actions = scheduler.on_timer(RefreshTimer::Regenerate, 1_700_000_020_450);
        assert_eq!(rendered(&actions)[0].window.boundary_secs, 1_700_000_030);
        assert_eq!(
            timer_delay(&actions, RefreshTimer::Regenerate),
            Some(Duration::from_millis(9_550))
        );
    }

    #[test]
    fn countdown_format_and_urgency() {
        assert_eq!(Countdown::new(9_999, 2).to_string(), "9.9s");
        assert_eq!(Countdown::new(10_000, 2).to_string(), "10.0s");
        assert_eq!(Countdown::new(2_999, 2).to_string(), "2.9s");
        assert!(Countdown::new(2_999, 2).urgent);
        assert!(!Countdown::new(3_000, 2).urgent);
        assert_eq!(Countdown::new(50, 2).to_string(), "0.0s");
    }

    #[test]
    fn stop_cancels_both_cadences() {
        let mut scheduler = scheduler();
        scheduler.start(0);

        let actions = scheduler.stop();
        assert_eq!(actions, vec![
            RefreshAction::CancelTimer(RefreshTimer::Countdown),
            RefreshAction::CancelTimer(RefreshTimer::Regenerate),
        ]);
        assert!(!scheduler.is_running());

        assert!(scheduler.on_timer(RefreshTimer::Countdown, 100).is_empty());
        assert!(scheduler.on_timer(RefreshTimer::Regenerate, 10_000).is_empty());
    }
}
