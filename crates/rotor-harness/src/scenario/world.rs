//! World state for scenario execution.
//!
//! The World holds one session and the scripted server it talks to, records
//! everything that crossed the wire, and provides oracle helpers.

use std::time::Duration;

use rotor_core::{
    CodeGenerator, Credentials, GeneratorConfig, ProtocolSession, SessionState,
    error::SessionError,
    report::{RecentLog, Report, StatusSink},
};
use rotor_proto::{ClientMessage, ServerMessage};

use crate::server::ScriptedServer;

/// World state: one session, one scripted server, and what happened.
pub struct World {
    session: ProtocolSession,
    server: ScriptedServer,
    generator_config: GeneratorConfig,
    generator: Option<CodeGenerator>,
    log: RecentLog,
    published: Vec<Credentials>,
    sent: Vec<(Duration, ClientMessage)>,
    delivered: Vec<ServerMessage>,
    errors: Vec<SessionError>,
    close_reasons: Vec<String>,
    epoch_ms: u64,
    elapsed: Duration,
}

impl World {
    pub(crate) fn new(
        session: ProtocolSession,
        server: ScriptedServer,
        generator_config: GeneratorConfig,
        epoch_ms: u64,
    ) -> Self {
        Self {
            session,
            server,
            generator_config,
            generator: None,
            log: RecentLog::default(),
            published: Vec::new(),
            sent: Vec::new(),
            delivered: Vec::new(),
            errors: Vec::new(),
            close_reasons: Vec::new(),
            epoch_ms,
            elapsed: Duration::ZERO,
        }
    }

    /// The session under test.
    pub fn session(&self) -> &ProtocolSession {
        &self.session
    }

    /// The scripted peer.
    pub fn server(&self) -> &ScriptedServer {
        &self.server
    }

    /// Generator built from the published credentials.
    pub fn generator(&self) -> Option<&CodeGenerator> {
        self.generator.as_ref()
    }

    /// Status reports, most recent first.
    pub fn log(&self) -> &RecentLog {
        &self.log
    }

    /// Every `Publish` action executed. A correct session publishes once.
    pub fn published(&self) -> &[Credentials] {
        &self.published
    }

    /// Client messages with the virtual time they were sent at.
    pub fn sent(&self) -> &[(Duration, ClientMessage)] {
        &self.sent
    }

    /// Server messages delivered to the session, in delivery order.
    pub fn delivered(&self) -> &[ServerMessage] {
        &self.delivered
    }

    /// Non-fatal errors the session returned.
    pub fn errors(&self) -> &[SessionError] {
        &self.errors
    }

    /// Reasons given by `Close` actions.
    pub fn close_reasons(&self) -> &[String] {
        &self.close_reasons
    }

    /// Virtual time elapsed since start.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Virtual wall clock.
    pub fn unix_time_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX);
        self.epoch_ms.saturating_add(elapsed)
    }

    /// Virtual times at which login attempts were sent.
    pub fn login_times(&self) -> Vec<Duration> {
        self.sent
            .iter()
            .filter(|(_, message)| {
                matches!(message, ClientMessage::Method { method, .. }
                    if method == "login" || method == "_loginWithToken")
            })
            .map(|(at, _)| *at)
            .collect()
    }

    /// Session reached `Closed` with credentials published exactly once.
    pub fn completed(&self) -> bool {
        self.session.state() == SessionState::Closed && self.published.len() == 1
    }

    pub(crate) fn session_mut(&mut self) -> &mut ProtocolSession {
        &mut self.session
    }

    pub(crate) fn server_mut(&mut self) -> &mut ScriptedServer {
        &mut self.server
    }

    pub(crate) fn record_sent(&mut self, message: ClientMessage) {
        self.sent.push((self.elapsed, message));
    }

    pub(crate) fn record_delivered(&mut self, message: ServerMessage) {
        self.delivered.push(message);
    }

    pub(crate) fn record_error(&mut self, error: SessionError) {
        self.log.report(&Report::warning(error.to_string()));
        self.errors.push(error);
    }

    pub(crate) fn record_close(&mut self, reason: String) {
        self.close_reasons.push(reason);
    }

    pub(crate) fn report(&mut self, report: &Report) {
        self.log.report(report);
    }

    pub(crate) fn publish(&mut self, credentials: Credentials) {
        let generator = CodeGenerator::new(credentials.clone(), self.generator_config.clone());
        self.generator = Some(generator);
        self.published.push(credentials);
    }

    pub(crate) fn advance_to(&mut self, at: Duration) {
        self.elapsed = self.elapsed.max(at);
    }
}
