//! Async driver for the refresh scheduler.
//!
//! Same shape as the session driver: a keyed deadline table, one
//! `sleep_until` on the earliest entry, and the scheduler decides what
//! happens when it fires.

use std::{collections::HashMap, future::Future, io};

use rotor_core::{
    env::Environment,
    scheduler::{RefreshAction, RefreshScheduler, RefreshTimer},
};

use crate::display::CodeDisplay;

/// Runs a [`RefreshScheduler`] against the environment's clocks.
pub struct RefreshDriver<E: Environment, D> {
    env: E,
    scheduler: RefreshScheduler,
    display: D,
    timers: HashMap<RefreshTimer, E::Instant>,
}

impl<E: Environment, D: CodeDisplay> RefreshDriver<E, D> {
    /// Create a driver. Nothing runs until [`RefreshDriver::run_until`].
    pub fn new(env: E, scheduler: RefreshScheduler, display: D) -> Self {
        Self { env, scheduler, display, timers: HashMap::new() }
    }

    /// The scheduler being driven.
    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// The display.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Start both cadences and run them until `stop` resolves.
    ///
    /// # Errors
    ///
    /// Returns the first display write failure. The scheduler is stopped
    /// either way.
    pub async fn run_until<F>(&mut self, stop: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let actions = self.scheduler.start(self.env.unix_time_ms());
        let result = self.drive(actions, stop).await;

        for action in self.scheduler.stop() {
            if let RefreshAction::CancelTimer(timer) = action {
                self.timers.remove(&timer);
            }
        }
        tracing::debug!("refresh stopped");
        result
    }

    async fn drive<F>(&mut self, mut actions: Vec<RefreshAction>, stop: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);

        loop {
            for action in actions.drain(..) {
                self.execute(action)?;
            }

            let Some((timer, at)) =
                self.timers.iter().min_by_key(|(_, at)| **at).map(|(t, at)| (*t, *at))
            else {
                return Ok(());
            };

            let stopped = tokio::select! {
                biased;
                () = &mut stop => true,
                () = self.env.sleep_until(at) => false,
            };
            if stopped {
                return Ok(());
            }

            self.timers.remove(&timer);
            actions = self.scheduler.on_timer(timer, self.env.unix_time_ms());
        }
    }

    fn execute(&mut self, action: RefreshAction) -> io::Result<()> {
        match action {
            RefreshAction::SetTimer { timer, after } => {
                self.timers.insert(timer, self.env.now() + after);
            },
            RefreshAction::CancelTimer(timer) => {
                self.timers.remove(&timer);
            },
            RefreshAction::Render(code) => {
                tracing::debug!(window = code.window.boundary_secs, "rendering code");
                self.display.show_code(&code)?;
            },
            RefreshAction::Countdown(countdown) => self.display.show_countdown(countdown)?,
            RefreshAction::Notice(notice) => {
                tracing::info!(window = notice.boundary_secs, "{notice}");
                self.display.show_notice(&notice)?;
            },
        }
        Ok(())
    }
}
