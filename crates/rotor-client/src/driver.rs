//! Async driver for the session state machine.
//!
//! The driver owns the transport and a keyed deadline table; the
//! [`ProtocolSession`] owns every decision. Each loop iteration executes
//! queued actions, then waits for whichever comes first: the next server
//! message or the earliest armed timer.
//!
//! Nothing is spawned. Cancelling a timer removes its key from the table, so
//! a cancelled timer can never reach the session.

use std::{
    collections::{HashMap, VecDeque},
    io,
};

use rotor_core::{
    Credentials, ProtocolSession, SessionAction, SessionConfig,
    env::Environment,
    error::SessionError,
    report::{Report, Severity, StatusSink},
    session::{SessionTimer, StartRequest},
    transport::{Transport, TransportConnection},
};
use tokio::sync::oneshot;

/// What woke the driver.
enum Wake {
    Received(Option<io::Result<String>>),
    Timer(SessionTimer),
}

/// Runs one session over a real or simulated transport.
pub struct SessionDriver<E: Environment, T: Transport, S> {
    env: E,
    transport: T,
    session: ProtocolSession,
    sink: S,
    publish: Option<oneshot::Sender<Credentials>>,
}

impl<E, T, S> SessionDriver<E, T, S>
where
    E: Environment,
    T: Transport,
    S: StatusSink,
{
    /// Create a driver. The receiver resolves as soon as the session
    /// publishes credentials, before the connection is closed.
    pub fn new(
        env: E,
        transport: T,
        config: SessionConfig,
        sink: S,
    ) -> (Self, oneshot::Receiver<Credentials>) {
        let (publish, published) = oneshot::channel();
        let session = ProtocolSession::new(config);
        (Self { env, transport, session, sink, publish: Some(publish) }, published)
    }

    /// The session being driven.
    pub fn session(&self) -> &ProtocolSession {
        &self.session
    }

    /// The status sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run the session until it is `Closed` or `Failed`.
    ///
    /// # Errors
    ///
    /// - `Config` if the start request is invalid; nothing is attempted
    /// - the session's failure if it ended without publishing credentials
    pub async fn run(&mut self, request: StartRequest) -> Result<Credentials, SessionError> {
        let mut queue: VecDeque<SessionAction> = self.session.start(request)?.into();
        let mut connection: Option<T::Connection> = None;
        let mut timers: HashMap<SessionTimer, E::Instant> = HashMap::new();

        loop {
            while let Some(action) = queue.pop_front() {
                self.execute(action, &mut connection, &mut timers, &mut queue).await;
            }

            if self.session.state().is_terminal() {
                break;
            }

            let deadline = timers.iter().min_by_key(|(_, at)| **at).map(|(t, at)| (*t, *at));
            let env = &self.env;

            let wake = tokio::select! {
                biased;
                received = next_message(connection.as_mut()) => Wake::Received(received),
                timer = next_timer(env, deadline) => Wake::Timer(timer),
            };

            match wake {
                Wake::Received(Some(Ok(text))) => match self.session.handle_text(&text) {
                    Ok(actions) => queue.extend(actions),
                    Err(e) => self.surface(&e),
                },
                Wake::Received(Some(Err(e))) => {
                    queue.extend(self.session.handle_transport_error(&e.to_string()));
                },
                Wake::Received(None) => {
                    connection = None;
                    queue.extend(self.session.handle_closed());
                },
                Wake::Timer(timer) => {
                    timers.remove(&timer);
                    queue.extend(self.session.handle_timer(timer));
                },
            }
        }

        match (self.session.credentials(), self.session.failure()) {
            (Some(credentials), _) => Ok(credentials.clone()),
            (None, Some(failure)) => Err(failure.clone()),
            (None, None) => Err(SessionError::InvalidState {
                state: self.session.state(),
                operation: "run",
            }),
        }
    }

    async fn execute(
        &mut self,
        action: SessionAction,
        connection: &mut Option<T::Connection>,
        timers: &mut HashMap<SessionTimer, E::Instant>,
        queue: &mut VecDeque<SessionAction>,
    ) {
        match action {
            SessionAction::Connect { endpoint } => match self.transport.connect(&endpoint).await {
                Ok(opened) => {
                    *connection = Some(opened);
                    match self.session.handle_open() {
                        Ok(actions) => queue.extend(actions),
                        Err(e) => self.surface(&e),
                    }
                },
                Err(e) => {
                    tracing::warn!(endpoint, error = %e, "connect failed");
                    queue.extend(self.session.handle_transport_error(&e.to_string()));
                },
            },
            SessionAction::Send(message) => {
                let Some(open) = connection.as_mut() else {
                    tracing::debug!(kind = message.kind(), "dropping message, no connection");
                    return;
                };
                let text = match rotor_proto::encode_client(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        self.surface(&SessionError::Protocol(e));
                        return;
                    },
                };
                tracing::debug!(kind = message.kind(), id = ?message.request_id(), "sending");
                if let Err(e) = open.send(text).await {
                    queue.extend(self.session.handle_transport_error(&e.to_string()));
                }
            },
            SessionAction::SetTimer { timer, after } => {
                timers.insert(timer, self.env.now() + after);
            },
            SessionAction::CancelTimer(timer) => {
                timers.remove(&timer);
            },
            SessionAction::Publish(credentials) => {
                tracing::info!(identity = %credentials.identity, "seed material published");
                if let Some(publish) = self.publish.take() {
                    if publish.send(credentials).is_err() {
                        tracing::debug!("credential receiver dropped");
                    }
                }
            },
            SessionAction::Report(report) => {
                mirror(&report);
                self.sink.report(&report);
            },
            SessionAction::Close { reason } => {
                if let Some(mut open) = connection.take() {
                    if let Err(e) = open.close().await {
                        tracing::debug!(error = %e, "close handshake failed");
                    }
                }
                tracing::info!(reason, "connection closed");
                queue.extend(self.session.handle_closed());
            },
        }
    }

    /// Non-fatal errors become warnings; the session carries on.
    fn surface(&mut self, error: &SessionError) {
        let report = Report::warning(error.to_string());
        mirror(&report);
        self.sink.report(&report);
    }
}

/// Mirror a report into the tracing stream at the matching level.
fn mirror(report: &Report) {
    match report.severity {
        Severity::Info => tracing::info!("{}", report.message),
        Severity::Success => tracing::info!(success = true, "{}", report.message),
        Severity::Warning => tracing::warn!("{}", report.message),
        Severity::Error => tracing::error!("{}", report.message),
    }
}

async fn next_message<C: TransportConnection>(
    connection: Option<&mut C>,
) -> Option<io::Result<String>> {
    match connection {
        Some(connection) => connection.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_timer<E: Environment>(
    env: &E,
    deadline: Option<(SessionTimer, E::Instant)>,
) -> SessionTimer {
    match deadline {
        Some((timer, at)) => {
            env.sleep_until(at).await;
            timer
        },
        None => std::future::pending().await,
    }
}
