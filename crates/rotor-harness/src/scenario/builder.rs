//! Declarative session scenarios.
//!
//! A [`Scenario`] configures the session and the scripted server; it only
//! becomes runnable once an oracle is attached.

use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use rotor_core::{
    GeneratorConfig, ProtocolSession, SessionAction, SessionConfig,
    session::{SessionTimer, StartRequest},
};
use rotor_proto::ServerMessage;

use crate::{
    scenario::{OracleFn, World},
    server::{ScriptedServer, ServerScript},
    sim_env::SimEnv,
};

/// Upper bound on executed steps; a session that has not settled by then is
/// looping.
const MAX_STEPS: usize = 10_000;

/// Scenario builder.
///
/// Configure the session and the scripted server, then add an oracle
/// verification function.
pub struct Scenario {
    session_config: SessionConfig,
    generator_config: GeneratorConfig,
    script: ServerScript,
    start: StartRequest,
    epoch_ms: u64,
    reorder_replies: bool,
}

impl Scenario {
    /// Create a new scenario with default configuration.
    pub fn new() -> Self {
        Self {
            session_config: SessionConfig::default(),
            generator_config: GeneratorConfig::default(),
            script: ServerScript::default(),
            start: StartRequest::new("wss://server/websocket", "bearer-token"),
            epoch_ms: SimEnv::DEFAULT_EPOCH_MS,
            reorder_replies: false,
        }
    }

    /// Configure the session.
    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Configure the generator built from published credentials.
    pub fn with_generator_config(mut self, config: GeneratorConfig) -> Self {
        self.generator_config = config;
        self
    }

    /// Configure the scripted server.
    pub fn with_script(mut self, script: ServerScript) -> Self {
        self.script = script;
        self
    }

    /// Start the session with this endpoint and credential.
    pub fn with_start(mut self, endpoint: &str, credential: &str) -> Self {
        self.start = StartRequest::new(endpoint, credential);
        self
    }

    /// Virtual wall-clock time at start.
    pub fn with_epoch_ms(mut self, epoch_ms: u64) -> Self {
        self.epoch_ms = epoch_ms;
        self
    }

    /// Deliver queued server messages newest first.
    ///
    /// Replies to a burst of requests then arrive in the reverse of the order
    /// they were sent, and a subscription's `ready` precedes its documents.
    pub fn with_reordered_replies(mut self) -> Self {
        self.reorder_replies = true;
        self
    }

    /// Attach the end-of-run check. Without one there is no `run`.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

/// A scenario with its check attached.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// Starts the session, then alternates between executing actions,
    /// delivering queued server messages and firing the earliest armed timer
    /// (advancing virtual time to its deadline) until the session is
    /// terminal or nothing is left to do.
    ///
    /// The oracle then judges the resulting world.
    pub fn run(self) -> Result<(), String> {
        let Scenario {
            session_config,
            generator_config,
            script,
            start,
            epoch_ms,
            reorder_replies,
        } = self.scenario;

        let world = World::new(
            ProtocolSession::new(session_config),
            ScriptedServer::new(script),
            generator_config,
            epoch_ms,
        );
        let mut run = Run {
            world,
            actions: VecDeque::new(),
            inbound: VecDeque::new(),
            timers: BTreeMap::new(),
            reorder_replies,
        };

        let actions = run
            .world
            .session_mut()
            .start(start)
            .map_err(|e| format!("session start failed: {e}"))?;
        run.actions.extend(actions);
        run.until_settled()?;

        (self.oracle)(&run.world)?;

        Ok(())
    }
}

/// Event loop over virtual time.
struct Run {
    world: World,
    actions: VecDeque<SessionAction>,
    inbound: VecDeque<ServerMessage>,
    timers: BTreeMap<SessionTimer, Duration>,
    reorder_replies: bool,
}

impl Run {
    fn until_settled(&mut self) -> Result<(), String> {
        for _ in 0..MAX_STEPS {
            if let Some(action) = self.actions.pop_front() {
                self.execute(action)?;
                continue;
            }

            if self.world.session().state().is_terminal() {
                return Ok(());
            }

            let next = if self.reorder_replies {
                self.inbound.pop_back()
            } else {
                self.inbound.pop_front()
            };
            if let Some(message) = next {
                self.deliver(message);
                continue;
            }

            let Some((timer, deadline)) = self.earliest_timer() else {
                return Ok(());
            };
            self.timers.remove(&timer);
            self.world.advance_to(deadline);
            let actions = self.world.session_mut().handle_timer(timer);
            self.actions.extend(actions);
        }

        Err(format!("scenario did not settle within {MAX_STEPS} steps"))
    }

    fn execute(&mut self, action: SessionAction) -> Result<(), String> {
        match action {
            SessionAction::Connect { .. } => {
                let actions = self
                    .world
                    .session_mut()
                    .handle_open()
                    .map_err(|e| format!("handle_open failed: {e}"))?;
                self.actions.extend(actions);
            },
            SessionAction::Send(message) => {
                let replies = self.world.server_mut().respond(&message);
                self.world.record_sent(message);
                self.inbound.extend(replies);
            },
            SessionAction::SetTimer { timer, after } => {
                self.timers.insert(timer, self.world.elapsed() + after);
            },
            SessionAction::CancelTimer(timer) => {
                self.timers.remove(&timer);
            },
            SessionAction::Publish(credentials) => self.world.publish(credentials),
            SessionAction::Report(report) => self.world.report(&report),
            SessionAction::Close { reason } => {
                self.world.record_close(reason);
                // Messages in flight are lost with the connection.
                self.inbound.clear();
                let actions = self.world.session_mut().handle_closed();
                self.actions.extend(actions);
            },
        }
        Ok(())
    }

    fn deliver(&mut self, message: ServerMessage) {
        self.world.record_delivered(message.clone());
        match self.world.session_mut().handle_message(message) {
            Ok(actions) => self.actions.extend(actions),
            Err(e) => self.world.record_error(e),
        }
    }

    fn earliest_timer(&self) -> Option<(SessionTimer, Duration)> {
        self.timers
            .iter()
            .min_by_key(|(timer, deadline)| (**deadline, **timer))
            .map(|(timer, deadline)| (*timer, *deadline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_requires_oracle() {
        let _scenario = Scenario::new().oracle(Box::new(|_world| Ok(())));
    }

    #[test]
    fn scenario_runs_to_completion() {
        let scenario = Scenario::new().oracle(Box::new(|world| {
            if world.completed() {
                Ok(())
            } else {
                Err(format!("session ended in {:?}", world.session().state()))
            }
        }));

        scenario.run().expect("scenario should succeed");
    }

    #[test]
    fn start_failure_is_reported() {
        let result = Scenario::new()
            .with_start("https://server", "tok")
            .oracle(Box::new(|_world| Ok(())))
            .run();

        assert!(result.unwrap_err().contains("session start failed"));
    }
}
