//! DDP session state machine.
//!
//! This module implements the client side of the session that obtains the
//! seed material: connect, negotiate the protocol, log in, subscribe to the
//! user document, extract (identity, secret), then hang up.
//!
//! # Architecture: Action-Based State Machine
//!
//! - Methods never perform I/O and never read a clock
//! - Methods return `Vec<SessionAction>` (or a `Result` of one)
//! - A driver executes actions: open the transport, send messages, arm and
//!   cancel timers, hand the credentials to the generator, close
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ start ┌────────────┐ open ┌─────────────┐ connected ┌────────────────┐
//! │ Idle │──────>│ Connecting │─────>│ Handshaking │──────────>│ Authenticating │
//! └──────┘       └────────────┘      └─────────────┘           └────────────────┘
//!                                                                      │ login ok
//!                                                                      ↓
//! ┌────────┐     ┌─────────┐ auto-close ┌────────┐  extracted  ┌─────────────────┐
//! │ Closed │<────│ Closing │<───────────│ Active │<────────────│ FetchingProfile │<─┐
//! └────────┘     └─────────┘            └────────┘ (Extracting)└─────────────────┘  │
//!                                                                      │ repair     │
//!                                                                      └────────────┘
//!
//! Any non-terminal state ──transport error / handshake refusal──> Failed
//! ```
//!
//! # Login Shotgun
//!
//! The accepted login method is not known in advance, so on `connected`
//! three attempts with different method names are scheduled at 0s, 1s and
//! 2s. They are independent timers, not retries: the first success moves the
//! session on and cancels whatever has not fired yet. Replies to attempts
//! that were already sent are matched and ignored.
//!
//! # Correlation
//!
//! Every `method` and `sub` gets a [`RequestId`] from a counter starting at
//! 1. Replies are matched by id only; they may arrive in any order.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    time::Duration,
};

use rotor_proto::{ClientMessage, RequestId, ServerMessage};
use serde_json::{Map, Value, json};
use url::Url;

use crate::{
    error::{ConfigError, SessionError},
    extract::{self, Credentials},
    report::Report,
};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, nothing started
    Idle,
    /// Transport is being opened
    Connecting,
    /// `connect` sent, waiting for `connected`
    Handshaking,
    /// Login attempts in flight
    Authenticating,
    /// Logged in, waiting for a user document carrying seed material
    FetchingProfile,
    /// Examining a user document
    Extracting,
    /// Credentials published; auto-close pending
    Active,
    /// Close requested, waiting for the transport to go away
    Closing,
    /// Closed normally
    Closed,
    /// Ended by an unrecoverable error
    Failed,
}

impl SessionState {
    /// `Closed` and `Failed` accept no further input.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

/// Login method names tried by the shotgun, in stagger order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoginMethod {
    /// `login` with `{resume: token}`
    Resume,
    /// `login` with `{token: token}`
    Token,
    /// `_loginWithToken` with the bare token
    LoginWithToken,
}

impl LoginMethod {
    /// All methods, in the order they are attempted.
    pub const ALL: [LoginMethod; 3] =
        [LoginMethod::Resume, LoginMethod::Token, LoginMethod::LoginWithToken];

    /// RPC method name.
    #[must_use]
    pub fn method_name(self) -> &'static str {
        match self {
            LoginMethod::Resume | LoginMethod::Token => "login",
            LoginMethod::LoginWithToken => "_loginWithToken",
        }
    }

    /// RPC params for `credential`.
    #[must_use]
    pub fn params(self, credential: &str) -> Vec<Value> {
        match self {
            LoginMethod::Resume => vec![json!({ "resume": credential })],
            LoginMethod::Token => vec![json!({ "token": credential })],
            LoginMethod::LoginWithToken => vec![json!(credential)],
        }
    }

    /// Position in the stagger; attempt `n` fires `n * login_stagger` after
    /// the handshake.
    #[must_use]
    pub fn position(self) -> u32 {
        match self {
            LoginMethod::Resume => 0,
            LoginMethod::Token => 1,
            LoginMethod::LoginWithToken => 2,
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoginMethod::Resume => "login(resume)",
            LoginMethod::Token => "login(token)",
            LoginMethod::LoginWithToken => "_loginWithToken",
        })
    }
}

/// Timers the session asks its driver to arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionTimer {
    /// Send the given staggered login attempt
    LoginAttempt(LoginMethod),
    /// Hang up after credentials were published
    AutoClose,
}

/// Actions returned by the session state machine.
///
/// The driver (simulation harness or the tokio client) executes these:
/// - `Connect`: open the transport, then call `handle_open` or
///   `handle_transport_error`
/// - `Send`: encode and send the message
/// - `SetTimer` / `CancelTimer`: arm or disarm a one-shot timer; when it
///   fires, call `handle_timer`
/// - `Publish`: hand the credentials to the code generator (happens once)
/// - `Report`: forward to the display/log collaborator
/// - `Close`: close the transport, then call `handle_closed`
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Open the transport to this endpoint
    Connect {
        /// Validated `ws`/`wss` URL
        endpoint: String,
    },

    /// Send this message to the server
    Send(ClientMessage),

    /// Arm a one-shot timer, replacing any armed timer with the same key
    SetTimer {
        /// Timer key
        timer: SessionTimer,
        /// Delay from now
        after: Duration,
    },

    /// Disarm a timer if it has not fired
    CancelTimer(SessionTimer),

    /// Seed material obtained
    Publish(Credentials),

    /// Status event for the display collaborator
    Report(Report),

    /// Close the transport with this reason
    Close {
        /// Reason for closing
        reason: String,
    },
}

/// Parameters supplied by the operator at session start.
#[derive(Clone, PartialEq, Eq)]
pub struct StartRequest {
    /// `ws://` or `wss://` URL of the DDP endpoint
    pub endpoint: String,
    /// Opaque bearer credential
    pub credential: String,
}

impl StartRequest {
    /// Build a start request.
    pub fn new(endpoint: impl Into<String>, credential: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), credential: credential.into() }
    }
}

impl fmt::Debug for StartRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartRequest")
            .field("endpoint", &self.endpoint)
            .field("credential", &format_args!("<redacted {} bytes>", self.credential.len()))
            .finish()
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Gap between staggered login attempts
    pub login_stagger: Duration,
    /// Delay between publishing credentials and closing the connection
    pub auto_close_delay: Duration,
    /// Collection the user document is pushed into
    pub user_collection: String,
    /// Publication carrying the user document
    pub subscription: String,
    /// RPC fetching the user profile
    pub profile_method: String,
    /// Fire-and-forget RPC asking the server to (re)issue seed material
    pub repair_method: String,
    /// Also call the repair RPC once right after login
    pub repair_on_login: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_stagger: Duration::from_secs(1),
            auto_close_delay: Duration::from_secs(2),
            user_collection: "users".to_string(),
            subscription: "userData".to_string(),
            profile_method: "users.get".to_string(),
            repair_method: "_users.repairGestixiAssociation".to_string(),
            repair_on_login: true,
        }
    }
}

/// What an outstanding RPC was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingCall {
    Login(LoginMethod),
    Profile,
    Repair,
}

/// Bearer credential, kept only while login attempts may still be sent.
#[derive(Clone)]
struct Bearer(String);

impl fmt::Debug for Bearer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bearer(<redacted {} bytes>)", self.0.len())
    }
}

/// Session state machine
///
/// Owns [`SessionState`], the request counter and the outstanding-request
/// table. The published credentials are write-once.
#[derive(Debug, Clone)]
pub struct ProtocolSession {
    state: SessionState,
    config: SessionConfig,
    bearer: Option<Bearer>,
    endpoint: Option<String>,
    session_id: Option<String>,
    user_id: Option<String>,
    next_id: RequestId,
    pending: HashMap<RequestId, PendingCall>,
    subscriptions: BTreeSet<RequestId>,
    armed: BTreeSet<SessionTimer>,
    logins_rejected: usize,
    document_id: Option<String>,
    document: Map<String, Value>,
    holding_document: bool,
    published: Option<Credentials>,
    failure: Option<SessionError>,
}

impl ProtocolSession {
    /// Create a session in [`SessionState::Idle`].
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: SessionState::Idle,
            config,
            bearer: None,
            endpoint: None,
            session_id: None,
            user_id: None,
            next_id: RequestId::FIRST,
            pending: HashMap::new(),
            subscriptions: BTreeSet::new(),
            armed: BTreeSet::new(),
            logins_rejected: 0,
            document_id: None,
            document: Map::new(),
            holding_document: false,
            published: None,
            failure: None,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Endpoint accepted by [`start`](Self::start)
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Server-assigned session id (after `connected`)
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// User id returned by the successful login
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Credentials, once published
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.published.as_ref()
    }

    /// The error that moved the session to `Failed`
    #[must_use]
    pub fn failure(&self) -> Option<&SessionError> {
        self.failure.as_ref()
    }

    /// Number of RPCs awaiting a `result`
    #[must_use]
    pub fn outstanding_requests(&self) -> usize {
        self.pending.len()
    }

    /// Timers armed and not yet fired or cancelled
    pub fn armed_timers(&self) -> impl Iterator<Item = SessionTimer> + '_ {
        self.armed.iter().copied()
    }

    /// Begin a session.
    ///
    /// Transitions to `Connecting` and returns a `Connect` action.
    ///
    /// # Errors
    ///
    /// - `Config` if the credential is empty or the endpoint is not a `ws`/
    ///   `wss` URL; the session stays `Idle` and nothing is attempted
    /// - `InvalidState` if not in `Idle`
    pub fn start(&mut self, request: StartRequest) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidState { state: self.state, operation: "start" });
        }

        if request.credential.trim().is_empty() {
            return Err(ConfigError::MissingCredential.into());
        }
        let endpoint = validate_endpoint(&request.endpoint)?;

        self.bearer = Some(Bearer(request.credential.trim().to_string()));
        self.endpoint = Some(endpoint.clone());
        self.transition(SessionState::Connecting);

        Ok(vec![
            SessionAction::Report(Report::info(format!("connecting to {endpoint}"))),
            SessionAction::Connect { endpoint },
        ])
    }

    /// Transport is open: negotiate the protocol version.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if not in `Connecting`.
    pub fn handle_open(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Connecting {
            return Err(SessionError::InvalidState { state: self.state, operation: "handle_open" });
        }

        self.transition(SessionState::Handshaking);

        Ok(vec![
            SessionAction::Report(Report::success("transport open, negotiating protocol")),
            SessionAction::Send(ClientMessage::connect()),
        ])
    }

    /// Decode and process one message received from the server.
    ///
    /// # Errors
    ///
    /// - `Protocol` if the text is not a valid message; it is dropped and the
    ///   session continues
    /// - anything [`handle_message`](Self::handle_message) returns
    pub fn handle_text(&mut self, text: &str) -> Result<Vec<SessionAction>, SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::InvalidState { state: self.state, operation: "handle_text" });
        }

        let message = rotor_proto::decode_server(text)?;
        self.handle_message(message)
    }

    /// Process one decoded message from the server.
    ///
    /// Fatal conditions (handshake refusal) are handled internally: the
    /// session moves to `Failed` and the returned actions close the
    /// transport. Non-fatal conditions are returned as errors and leave the
    /// state unchanged.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if the session is `Closed` or `Failed`
    /// - `UnexpectedMessage` if the kind makes no sense in the current state
    /// - `UnmatchedReply` for a `result` with no outstanding request
    /// - `Server` for server complaints after the handshake
    /// - `Extraction` for an RPC result that lacks part of the seed material
    pub fn handle_message(
        &mut self,
        message: ServerMessage,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.state.is_terminal() {
            return Err(SessionError::InvalidState {
                state: self.state,
                operation: "handle_message",
            });
        }

        tracing::trace!(state = ?self.state, kind = message.kind(), "handling server message");

        match message {
            ServerMessage::Ping { id } => {
                Ok(vec![SessionAction::Send(ClientMessage::pong(id))])
            },
            ServerMessage::Pong { .. } | ServerMessage::Updated { .. } => Ok(vec![]),
            ServerMessage::Connected { session } => self.on_connected(session),
            ServerMessage::Failed { version } => self.on_version_refused(version),
            ServerMessage::Error { error, reason } => self.on_server_error(error, reason),
            ServerMessage::Result { id, result, error } => self.on_result(id, result, error),
            ServerMessage::Added { collection, id, fields } => {
                self.on_document("added", &collection, id, fields, None, true)
            },
            ServerMessage::Changed { collection, id, fields, cleared } => {
                self.on_document("changed", &collection, id, fields, cleared, false)
            },
            ServerMessage::Ready { subs } => {
                tracing::debug!(?subs, "subscriptions ready");
                Ok(vec![])
            },
            ServerMessage::Nosub { id, error } => self.on_nosub(&id, error),
            ServerMessage::Unrecognized => {
                tracing::trace!("ignoring unrecognized message kind");
                Ok(vec![])
            },
        }
    }

    /// A timer armed by a `SetTimer` action fired.
    ///
    /// Timers that were cancelled, or whose purpose has lapsed (a login
    /// attempt after success, an auto-close after a manual close), are
    /// no-ops.
    pub fn handle_timer(&mut self, timer: SessionTimer) -> Vec<SessionAction> {
        if !self.armed.remove(&timer) {
            tracing::trace!(?timer, "ignoring stale timer");
            return vec![];
        }

        match timer {
            SessionTimer::LoginAttempt(method) if self.state == SessionState::Authenticating => {
                self.send_login(method)
            },
            SessionTimer::AutoClose if self.state == SessionState::Active => {
                self.begin_close("seed material obtained")
            },
            _ => vec![],
        }
    }

    /// Operator-requested close.
    pub fn close(&mut self, reason: &str) -> Vec<SessionAction> {
        match self.state {
            SessionState::Idle => {
                self.transition(SessionState::Closed);
                vec![]
            },
            SessionState::Closing | SessionState::Closed | SessionState::Failed => vec![],
            _ => self.begin_close(reason),
        }
    }

    /// The transport is gone (closed by us or by the peer).
    ///
    /// Closing after credentials were obtained is normal. Losing the
    /// connection earlier is a transport failure.
    pub fn handle_closed(&mut self) -> Vec<SessionAction> {
        match self.state {
            SessionState::Closing | SessionState::Active => {
                let mut actions = self.cancel_all_timers();
                self.bearer = None;
                self.transition(SessionState::Closed);
                actions.push(SessionAction::Report(Report::info("connection closed")));
                actions
            },
            SessionState::Idle | SessionState::Closed | SessionState::Failed => vec![],
            _ => self.fail(SessionError::Transport(
                "connection closed before seed material was obtained".to_string(),
            )),
        }
    }

    /// The transport reported an error. The session fails; there is no
    /// automatic reconnect.
    pub fn handle_transport_error(&mut self, reason: &str) -> Vec<SessionAction> {
        if self.state.is_terminal() {
            return vec![];
        }
        self.fail(SessionError::Transport(reason.to_string()))
    }

    fn on_connected(&mut self, session: String) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Handshaking {
            return Err(SessionError::UnexpectedMessage { state: self.state, kind: "connected" });
        }

        self.transition(SessionState::Authenticating);
        let mut actions =
            vec![SessionAction::Report(Report::success(format!("connected, session {session}")))];
        self.session_id = Some(session);

        for method in LoginMethod::ALL {
            if method.position() == 0 {
                actions.extend(self.send_login(method));
            } else {
                let timer = SessionTimer::LoginAttempt(method);
                self.armed.insert(timer);
                actions.push(SessionAction::SetTimer {
                    timer,
                    after: self.config.login_stagger * method.position(),
                });
            }
        }

        Ok(actions)
    }

    fn on_version_refused(
        &mut self,
        version: Option<String>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Handshaking {
            return Err(SessionError::UnexpectedMessage { state: self.state, kind: "failed" });
        }

        let detail = match version {
            Some(version) => format!("server requires protocol version {version}"),
            None => "server refused protocol version".to_string(),
        };
        Ok(self.fail(SessionError::HandshakeRejected(detail)))
    }

    fn on_server_error(
        &mut self,
        error: Option<Value>,
        reason: Option<String>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let raw = match (error, reason) {
            (Some(error), _) => error.to_string(),
            (None, Some(reason)) => reason,
            (None, None) => "unspecified error".to_string(),
        };

        match self.state {
            SessionState::Connecting | SessionState::Handshaking => {
                Ok(self.fail(SessionError::HandshakeRejected(raw)))
            },
            _ => Err(SessionError::Server(raw)),
        }
    }

    fn on_result(
        &mut self,
        id: RequestId,
        result: Option<Value>,
        error: Option<Value>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        let Some(call) = self.pending.remove(&id) else {
            return Err(SessionError::UnmatchedReply(id));
        };

        tracing::debug!(%id, ?call, has_error = error.is_some(), "matched reply");

        match call {
            PendingCall::Login(method) => Ok(self.on_login_reply(method, result, error)),
            PendingCall::Profile => self.on_profile_reply(result, error),
            PendingCall::Repair => self.on_repair_reply(result, error),
        }
    }

    fn on_login_reply(
        &mut self,
        method: LoginMethod,
        result: Option<Value>,
        error: Option<Value>,
    ) -> Vec<SessionAction> {
        if self.state != SessionState::Authenticating {
            tracing::debug!(%method, state = ?self.state, "ignoring late login reply");
            return vec![];
        }

        let granted = result.as_ref().and_then(login_grant);

        match (granted, error) {
            (Some(user_id), None) => self.on_login_success(method, user_id),
            (_, error) => {
                self.logins_rejected += 1;
                let detail = error.map_or_else(
                    || "reply carried no user id and token".to_string(),
                    |error| error.to_string(),
                );
                let mut actions = vec![SessionAction::Report(Report::warning(format!(
                    "login via {method} rejected: {detail}"
                )))];

                if self.logins_rejected >= LoginMethod::ALL.len() {
                    actions.extend(self.fail(SessionError::LoginRejected {
                        attempts: self.logins_rejected,
                    }));
                }
                actions
            },
        }
    }

    fn on_login_success(&mut self, method: LoginMethod, user_id: String) -> Vec<SessionAction> {
        self.transition(SessionState::FetchingProfile);

        let mut actions = self.cancel_login_timers();
        actions.push(SessionAction::Report(Report::success(format!(
            "logged in via {method} as {user_id}"
        ))));

        let sub_id = self.allocate_id();
        self.subscriptions.insert(sub_id);
        actions.push(SessionAction::Send(ClientMessage::sub(
            sub_id,
            self.config.subscription.clone(),
            vec![json!(user_id)],
        )));

        let profile_id = self.allocate_id();
        self.pending.insert(profile_id, PendingCall::Profile);
        actions.push(SessionAction::Send(ClientMessage::method(
            profile_id,
            self.config.profile_method.clone(),
            vec![json!(user_id)],
        )));

        if self.config.repair_on_login {
            actions.extend(self.send_repair());
        }

        if self.document_id.as_deref().is_some_and(|doc| doc != user_id) {
            tracing::debug!("discarding held document for another user");
            self.document.clear();
            self.document_id = None;
            self.holding_document = false;
        }
        self.user_id = Some(user_id);

        if std::mem::take(&mut self.holding_document) {
            actions.extend(self.try_extract());
        }

        actions
    }

    fn on_profile_reply(
        &mut self,
        result: Option<Value>,
        error: Option<Value>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if let Some(error) = error {
            return Err(SessionError::Server(format!("profile fetch failed: {error}")));
        }
        if self.state != SessionState::FetchingProfile {
            return Ok(vec![]);
        }

        match result {
            Some(ref record) if extract::is_token_record(record) => {
                self.publish_token_record(record)
            },
            Some(Value::Object(ref fields)) => {
                let credentials = extract::from_user_fields(fields)?;
                self.transition(SessionState::Extracting);
                Ok(self.publish(credentials))
            },
            _ => Ok(vec![]),
        }
    }

    fn on_repair_reply(
        &mut self,
        result: Option<Value>,
        error: Option<Value>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if let Some(error) = error {
            return Err(SessionError::Server(format!("repair call failed: {error}")));
        }

        match result {
            Some(ref record)
                if self.state == SessionState::FetchingProfile
                    && extract::is_token_record(record) =>
            {
                self.publish_token_record(record)
            },
            _ => Ok(vec![SessionAction::Report(Report::info("repair call acknowledged"))]),
        }
    }

    /// Publish from an RPC result that is itself a token record.
    fn publish_token_record(&mut self, record: &Value) -> Result<Vec<SessionAction>, SessionError> {
        let credentials = extract::from_token_record(record)?;
        self.transition(SessionState::Extracting);
        Ok(self.publish(credentials))
    }

    fn on_document(
        &mut self,
        kind: &'static str,
        collection: &str,
        id: Option<String>,
        fields: Option<Map<String, Value>>,
        cleared: Option<Vec<String>>,
        replace: bool,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if collection != self.config.user_collection {
            tracing::trace!(collection, "ignoring push for other collection");
            return Ok(vec![]);
        }

        if let (Some(doc), Some(user)) = (id.as_deref(), self.user_id.as_deref()) {
            if doc != user {
                tracing::debug!(doc, "ignoring push for another user document");
                return Ok(vec![]);
            }
        }

        match self.state {
            SessionState::Authenticating => {
                self.merge_document(id, fields, cleared, replace);
                self.holding_document = true;
                Ok(vec![SessionAction::Report(Report::info(
                    "user document arrived before login completed, holding it",
                ))])
            },
            SessionState::FetchingProfile => {
                self.merge_document(id, fields, cleared, replace);
                Ok(self.try_extract())
            },
            SessionState::Active | SessionState::Closing => {
                tracing::debug!("credentials already published, ignoring document push");
                Ok(vec![])
            },
            state => Err(SessionError::UnexpectedMessage { state, kind }),
        }
    }

    fn on_nosub(
        &mut self,
        id: &str,
        error: Option<Value>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if let Ok(id) = RequestId::parse(id) {
            self.subscriptions.remove(&id);
        }
        match error {
            Some(error) => Err(SessionError::Server(format!("subscription {id} refused: {error}"))),
            None => Ok(vec![]),
        }
    }

    fn merge_document(
        &mut self,
        id: Option<String>,
        fields: Option<Map<String, Value>>,
        cleared: Option<Vec<String>>,
        replace: bool,
    ) {
        if replace {
            self.document.clear();
        }
        if id.is_some() {
            self.document_id = id;
        }
        if let Some(fields) = fields {
            self.document.extend(fields);
        }
        for key in cleared.unwrap_or_default() {
            self.document.remove(&key);
        }
    }

    fn try_extract(&mut self) -> Vec<SessionAction> {
        self.transition(SessionState::Extracting);

        match extract::from_user_fields(&self.document) {
            Ok(credentials) => self.publish(credentials),
            Err(e) => {
                self.transition(SessionState::FetchingProfile);
                let mut actions = vec![SessionAction::Report(Report::warning(format!(
                    "user document incomplete ({e}), requesting repair"
                )))];
                actions.extend(self.send_repair());
                actions
            },
        }
    }

    fn publish(&mut self, credentials: Credentials) -> Vec<SessionAction> {
        if self.published.is_some() {
            tracing::debug!("credentials already published");
            return vec![];
        }

        self.transition(SessionState::Active);
        self.published = Some(credentials.clone());
        self.bearer = None;
        self.armed.insert(SessionTimer::AutoClose);

        vec![
            SessionAction::Report(Report::success(format!(
                "seed material obtained for identity {}",
                credentials.identity
            ))),
            SessionAction::Publish(credentials),
            SessionAction::SetTimer {
                timer: SessionTimer::AutoClose,
                after: self.config.auto_close_delay,
            },
        ]
    }

    fn send_login(&mut self, method: LoginMethod) -> Vec<SessionAction> {
        let Some(bearer) = self.bearer.as_ref() else {
            return vec![];
        };
        let params = method.params(&bearer.0);

        let id = self.allocate_id();
        self.pending.insert(id, PendingCall::Login(method));
        tracing::debug!(%id, %method, "sending login attempt");

        vec![SessionAction::Send(ClientMessage::method(id, method.method_name(), params))]
    }

    fn send_repair(&mut self) -> Vec<SessionAction> {
        let id = self.allocate_id();
        self.pending.insert(id, PendingCall::Repair);

        vec![
            SessionAction::Report(Report::info(format!(
                "calling {}",
                self.config.repair_method
            ))),
            SessionAction::Send(ClientMessage::method(
                id,
                self.config.repair_method.clone(),
                vec![json!({})],
            )),
        ]
    }

    fn begin_close(&mut self, reason: &str) -> Vec<SessionAction> {
        self.transition(SessionState::Closing);

        let mut actions = self.cancel_all_timers();
        actions.push(SessionAction::Report(Report::info(format!("closing: {reason}"))));
        actions.push(SessionAction::Close { reason: reason.to_string() });
        actions
    }

    fn fail(&mut self, error: SessionError) -> Vec<SessionAction> {
        tracing::warn!(state = ?self.state, %error, "session failed");
        self.transition(SessionState::Failed);

        let mut actions = self.cancel_all_timers();
        actions.push(SessionAction::Report(Report::error(error.to_string())));
        actions.push(SessionAction::Close { reason: error.to_string() });

        self.bearer = None;
        self.pending.clear();
        self.failure = Some(error);
        actions
    }

    fn cancel_login_timers(&mut self) -> Vec<SessionAction> {
        LoginMethod::ALL
            .into_iter()
            .map(SessionTimer::LoginAttempt)
            .filter(|timer| self.armed.remove(timer))
            .map(SessionAction::CancelTimer)
            .collect()
    }

    fn cancel_all_timers(&mut self) -> Vec<SessionAction> {
        std::mem::take(&mut self.armed).into_iter().map(SessionAction::CancelTimer).collect()
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id = id.next();
        id
    }

    fn transition(&mut self, to: SessionState) {
        tracing::debug!(from = ?self.state, ?to, "session transition");
        self.state = to;
    }
}

/// A login reply grants access when it carries both a user id and a token.
fn login_grant(result: &Value) -> Option<String> {
    let user_id = result.get("id").and_then(Value::as_str).filter(|s| !s.is_empty())?;
    result.get("token").and_then(Value::as_str).filter(|s| !s.is_empty())?;
    Some(user_id.to_string())
}

fn validate_endpoint(endpoint: &str) -> Result<String, ConfigError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::MissingEndpoint);
    }

    let url = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(endpoint.to_string()),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;

    const ENDPOINT: &str = "wss://example.test/websocket";

    fn sent(actions: &[SessionAction]) -> Vec<&ClientMessage> {
        actions
            .iter()
            .filter_map(|a| match a {
                SessionAction::Send(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    fn method_ids(actions: &[SessionAction], name: &str) -> Vec<RequestId> {
        sent(actions)
            .into_iter()
            .filter_map(|m| match m {
                ClientMessage::Method { method, id, .. } if method == name => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn connected() -> ServerMessage {
        ServerMessage::Connected { session: "abc".to_string() }
    }

    fn login_ok(id: RequestId) -> ServerMessage {
        ServerMessage::Result {
            id,
            result: Some(json!({ "id": "u1", "token": "t1" })),
            error: None,
        }
    }

    fn user_added(fields: Value) -> ServerMessage {
        let Value::Object(fields) = fields else { panic!("fields must be an object") };
        ServerMessage::Added {
            collection: "users".to_string(),
            id: Some("u1".to_string()),
            fields: Some(fields),
        }
    }

    fn complete_fields() -> Value {
        json!({
            "profile": { "gestixiIds": ["g1"] },
            "qrCodeTokens": { "arkose": { "hashed": "h1" } }
        })
    }

    /// Session in `Authenticating` with the first login sent as id 1.
    fn authenticating() -> ProtocolSession {
        let mut session = ProtocolSession::new(SessionConfig::default());
        session.start(StartRequest::new(ENDPOINT, "bearer-token")).unwrap();
        session.handle_open().unwrap();
        session.handle_message(connected()).unwrap();
        session
    }

    /// Session in `FetchingProfile` after login id 1 succeeded.
    fn fetching() -> ProtocolSession {
        let mut session = authenticating();
        session.handle_message(login_ok(RequestId::new(1))).unwrap();
        session
    }

    #[test]
    fn session_lifecycle() {
        let mut session = ProtocolSession::new(SessionConfig::default());
        assert_eq!(session.state(), SessionState::Idle);

        let actions = session.start(StartRequest::new(ENDPOINT, "bearer-token")).unwrap();
        assert_eq!(session.state(), SessionState::Connecting);
        assert!(actions.contains(&SessionAction::Connect { endpoint: ENDPOINT.to_string() }));

        let actions = session.handle_open().unwrap();
        assert_eq!(session.state(), SessionState::Handshaking);
        assert_eq!(sent(&actions), vec![&ClientMessage::connect()]);

        session.handle_message(connected()).unwrap();
        assert_eq!(session.state(), SessionState::Authenticating);
        assert_eq!(session.session_id(), Some("abc"));

        session.handle_message(login_ok(RequestId::new(1))).unwrap();
        assert_eq!(session.state(), SessionState::FetchingProfile);
        assert_eq!(session.user_id(), Some("u1"));

        let actions = session.handle_message(user_added(complete_fields())).unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert!(actions.contains(&SessionAction::Publish(Credentials::new("g1", "h1"))));
        assert!(actions.contains(&SessionAction::SetTimer {
            timer: SessionTimer::AutoClose,
            after: Duration::from_secs(2),
        }));

        let actions = session.handle_timer(SessionTimer::AutoClose);
        assert_eq!(session.state(), SessionState::Closing);
        assert!(actions.iter().any(|a| matches!(a, SessionAction::Close { .. })));

        session.handle_closed();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.armed_timers().count(), 0);
    }

    #[test]
    fn start_rejects_empty_credential() {
        let mut session = ProtocolSession::new(SessionConfig::default());
        let result = session.start(StartRequest::new(ENDPOINT, "   "));
        assert_eq!(result, Err(SessionError::Config(ConfigError::MissingCredential)));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_rejects_bad_endpoints() {
        let mut session = ProtocolSession::new(SessionConfig::default());

        assert_eq!(
            session.start(StartRequest::new("", "tok")),
            Err(SessionError::Config(ConfigError::MissingEndpoint))
        );
        assert!(matches!(
            session.start(StartRequest::new("not a url", "tok")),
            Err(SessionError::Config(ConfigError::InvalidEndpoint { .. }))
        ));
        assert_eq!(
            session.start(StartRequest::new("https://example.test", "tok")),
            Err(SessionError::Config(ConfigError::UnsupportedScheme("https".to_string())))
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_only_from_idle() {
        let mut session = authenticating();
        let result = session.start(StartRequest::new(ENDPOINT, "tok"));
        assert!(matches!(result, Err(SessionError::InvalidState { operation: "start", .. })));
    }

    #[test]
    fn connected_schedules_three_staggered_logins() {
        let mut session = ProtocolSession::new(SessionConfig::default());
        session.start(StartRequest::new(ENDPOINT, "bearer-token")).unwrap();
        session.handle_open().unwrap();

        let actions = session.handle_message(connected()).unwrap();

        let immediate = sent(&actions);
        assert_eq!(immediate.len(), 1);
        assert_eq!(
            immediate[0],
            &ClientMessage::method(
                RequestId::new(1),
                "login",
                vec![json!({ "resume": "bearer-token" })]
            )
        );

        let timers: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                SessionAction::SetTimer { timer, after } => Some((*timer, *after)),
                _ => None,
            })
            .collect();
        assert_eq!(timers, vec![
            (SessionTimer::LoginAttempt(LoginMethod::Token), Duration::from_secs(1)),
            (SessionTimer::LoginAttempt(LoginMethod::LoginWithToken), Duration::from_secs(2)),
        ]);

        let second = session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::Token));
        assert_eq!(sent(&second), vec![&ClientMessage::method(
            RequestId::new(2),
            "login",
            vec![json!({ "token": "bearer-token" })]
        )]);

        let third = session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::LoginWithToken));
        assert_eq!(sent(&third), vec![&ClientMessage::method(
            RequestId::new(3),
            "_loginWithToken",
            vec![json!("bearer-token")]
        )]);
    }

    #[test]
    fn login_success_cancels_pending_attempts() {
        let mut session = authenticating();
        session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::Token));

        // Attempt 2 succeeds before attempt 3 fires.
        let actions = session.handle_message(login_ok(RequestId::new(2))).unwrap();
        assert!(actions.contains(&SessionAction::CancelTimer(SessionTimer::LoginAttempt(
            LoginMethod::LoginWithToken
        ))));
        assert_eq!(session.state(), SessionState::FetchingProfile);

        // The cancelled timer firing anyway must not produce a fourth login.
        let late = session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::LoginWithToken));
        assert!(late.is_empty());

        // The reply to attempt 1 is matched and ignored.
        let actions = session.handle_message(login_ok(RequestId::new(1))).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn login_success_subscribes_and_fetches_profile() {
        let mut session = authenticating();
        let actions = session.handle_message(login_ok(RequestId::new(1))).unwrap();

        let messages = sent(&actions);
        assert!(messages.contains(&&ClientMessage::sub(
            RequestId::new(2),
            "userData",
            vec![json!("u1")]
        )));
        assert!(messages.contains(&&ClientMessage::method(
            RequestId::new(3),
            "users.get",
            vec![json!("u1")]
        )));
        assert_eq!(method_ids(&actions, "_users.repairGestixiAssociation"), vec![RequestId::new(
            4
        )]);
    }

    #[test]
    fn repair_on_login_can_be_disabled() {
        let config = SessionConfig { repair_on_login: false, ..SessionConfig::default() };
        let mut session = ProtocolSession::new(config);
        session.start(StartRequest::new(ENDPOINT, "tok")).unwrap();
        session.handle_open().unwrap();
        session.handle_message(connected()).unwrap();

        let actions = session.handle_message(login_ok(RequestId::new(1))).unwrap();
        assert!(method_ids(&actions, "_users.repairGestixiAssociation").is_empty());
    }

    #[test]
    fn replies_match_out_of_order() {
        let mut session = authenticating();
        session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::Token));
        session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::LoginWithToken));

        // Reply to the oldest request arrives last; the first reply (id 3)
        // is a rejection, then id 1 grants access.
        let rejected = ServerMessage::Result {
            id: RequestId::new(3),
            result: None,
            error: Some(json!({ "error": 403 })),
        };
        session.handle_message(rejected).unwrap();
        assert_eq!(session.state(), SessionState::Authenticating);

        session.handle_message(login_ok(RequestId::new(1))).unwrap();
        assert_eq!(session.state(), SessionState::FetchingProfile);
    }

    #[test]
    fn unmatched_reply_is_an_error() {
        let mut session = authenticating();
        let result = session.handle_message(login_ok(RequestId::new(99)));
        assert_eq!(result, Err(SessionError::UnmatchedReply(RequestId::new(99))));
        assert_eq!(session.state(), SessionState::Authenticating);
    }

    #[test]
    fn all_logins_rejected_fails_session() {
        let mut session = authenticating();
        session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::Token));
        session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::LoginWithToken));

        for id in 1..=3 {
            session
                .handle_message(ServerMessage::Result {
                    id: RequestId::new(id),
                    result: None,
                    error: Some(json!("forbidden")),
                })
                .unwrap();
        }

        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(session.failure(), Some(&SessionError::LoginRejected { attempts: 3 }));
    }

    #[test]
    fn ping_answered_in_every_live_state() {
        let ping = || ServerMessage::Ping { id: Some("k".to_string()) };
        let pong = SessionAction::Send(ClientMessage::pong(Some("k".to_string())));

        let mut session = ProtocolSession::new(SessionConfig::default());
        assert_eq!(session.handle_message(ping()).unwrap(), vec![pong.clone()]);

        session.start(StartRequest::new(ENDPOINT, "tok")).unwrap();
        session.handle_open().unwrap();
        assert_eq!(session.handle_message(ping()).unwrap(), vec![pong.clone()]);

        let mut session = fetching();
        assert_eq!(session.handle_message(ping()).unwrap(), vec![pong.clone()]);

        session.handle_message(user_added(complete_fields())).unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.handle_message(ping()).unwrap(), vec![pong.clone()]);

        session.handle_timer(SessionTimer::AutoClose);
        assert_eq!(session.state(), SessionState::Closing);
        assert_eq!(session.handle_message(ping()).unwrap(), vec![pong]);

        session.handle_closed();
        assert!(matches!(
            session.handle_message(ping()),
            Err(SessionError::InvalidState { state: SessionState::Closed, .. })
        ));
    }

    #[test]
    fn incomplete_document_triggers_repair_and_waits() {
        let mut session = fetching();

        let actions = session
            .handle_message(user_added(json!({ "profile": { "gestixiIds": ["g1"] } })))
            .unwrap();
        assert_eq!(session.state(), SessionState::FetchingProfile);
        assert_eq!(method_ids(&actions, "_users.repairGestixiAssociation").len(), 1);
        let missing = ExtractionError::MissingSecret.to_string();
        assert!(actions.iter().any(|a| matches!(
            a,
            SessionAction::Report(Report { message, .. }) if message.contains(&missing)
        )));

        // The repaired document arrives as a `changed` push.
        let Value::Object(fields) = json!({ "qrCodeTokens": { "hashed": "h2" } }) else {
            unreachable!()
        };
        let actions = session
            .handle_message(ServerMessage::Changed {
                collection: "users".to_string(),
                id: Some("u1".to_string()),
                fields: Some(fields),
                cleared: None,
            })
            .unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert!(actions.contains(&SessionAction::Publish(Credentials::new("g1", "h2"))));
    }

    #[test]
    fn document_before_login_is_held() {
        let mut session = authenticating();

        let actions = session.handle_message(user_added(complete_fields())).unwrap();
        assert!(sent(&actions).is_empty());
        assert_eq!(session.state(), SessionState::Authenticating);

        let actions = session.handle_message(login_ok(RequestId::new(1))).unwrap();
        assert_eq!(session.state(), SessionState::Active);
        assert!(actions.contains(&SessionAction::Publish(Credentials::new("g1", "h1"))));
    }

    #[test]
    fn other_collections_and_users_are_ignored() {
        let mut session = fetching();

        let Value::Object(fields) = complete_fields() else { unreachable!() };
        let other_collection = ServerMessage::Added {
            collection: "settings".to_string(),
            id: Some("u1".to_string()),
            fields: Some(fields.clone()),
        };
        assert_eq!(session.handle_message(other_collection).unwrap(), vec![]);

        let other_user = ServerMessage::Added {
            collection: "users".to_string(),
            id: Some("u2".to_string()),
            fields: Some(fields),
        };
        assert_eq!(session.handle_message(other_user).unwrap(), vec![]);
        assert_eq!(session.state(), SessionState::FetchingProfile);
    }

    #[test]
    fn credentials_published_once() {
        let mut session = fetching();
        session.handle_message(user_added(complete_fields())).unwrap();

        let again = session
            .handle_message(user_added(json!({
                "profile": { "gestixiIds": ["other"] },
                "qrCodeTokens": { "hashed": "other" }
            })))
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(session.credentials(), Some(&Credentials::new("g1", "h1")));
    }

    #[test]
    fn profile_reply_with_token_record_publishes() {
        let mut session = fetching();
        let actions = session
            .handle_message(ServerMessage::Result {
                id: RequestId::new(3),
                result: Some(json!({ "gestixiId": "g9", "hashed": "h9" })),
                error: None,
            })
            .unwrap();
        assert!(actions.contains(&SessionAction::Publish(Credentials::new("g9", "h9"))));
    }

    #[test]
    fn repair_reply_with_token_record_publishes() {
        let mut session = fetching();
        let actions = session
            .handle_message(ServerMessage::Result {
                id: RequestId::new(4),
                result: Some(json!({ "gestixiId": "g9", "hashed": "h9" })),
                error: None,
            })
            .unwrap();

        assert!(actions.contains(&SessionAction::Publish(Credentials::new("g9", "h9"))));
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn empty_repair_reply_is_acknowledged() {
        let mut session = fetching();
        let actions = session
            .handle_message(ServerMessage::Result {
                id: RequestId::new(4),
                result: None,
                error: None,
            })
            .unwrap();

        assert_eq!(actions, vec![SessionAction::Report(Report::info("repair call acknowledged"))]);
        assert_eq!(session.state(), SessionState::FetchingProfile);
    }

    #[test]
    fn partial_token_record_is_an_extraction_error() {
        let mut session = fetching();
        let result = session.handle_message(ServerMessage::Result {
            id: RequestId::new(3),
            result: Some(json!({ "gestixiId": "g9" })),
            error: None,
        });

        assert_eq!(result, Err(SessionError::Extraction(ExtractionError::MissingSecret)));
        assert!(!result.unwrap_err().is_fatal());
        assert_eq!(session.state(), SessionState::FetchingProfile);
        assert_eq!(session.credentials(), None);
    }

    #[test]
    fn server_error_during_handshake_is_fatal() {
        let mut session = ProtocolSession::new(SessionConfig::default());
        session.start(StartRequest::new(ENDPOINT, "tok")).unwrap();
        session.handle_open().unwrap();

        let actions = session
            .handle_message(ServerMessage::Error {
                error: None,
                reason: Some("Must connect first".to_string()),
            })
            .unwrap();

        assert_eq!(session.state(), SessionState::Failed);
        assert!(actions.iter().any(|a| matches!(a, SessionAction::Close { .. })));
        assert_eq!(
            session.failure(),
            Some(&SessionError::HandshakeRejected("Must connect first".to_string()))
        );
    }

    #[test]
    fn version_refusal_is_fatal() {
        let mut session = ProtocolSession::new(SessionConfig::default());
        session.start(StartRequest::new(ENDPOINT, "tok")).unwrap();
        session.handle_open().unwrap();

        session.handle_message(ServerMessage::Failed { version: Some("2".to_string()) }).unwrap();
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn server_error_after_handshake_is_surfaced() {
        let mut session = fetching();
        let result = session.handle_message(ServerMessage::Error {
            error: Some(json!({ "code": 500 })),
            reason: None,
        });
        assert_eq!(result, Err(SessionError::Server(r#"{"code":500}"#.to_string())));
        assert_eq!(session.state(), SessionState::FetchingProfile);
    }

    #[test]
    fn malformed_text_is_dropped() {
        let mut session = fetching();
        let result = session.handle_text("{not json");
        assert!(matches!(result, Err(SessionError::Protocol(_))));
        assert!(!result.unwrap_err().is_fatal());
        assert_eq!(session.state(), SessionState::FetchingProfile);
    }

    #[test]
    fn transport_error_fails_and_cancels_timers() {
        let mut session = authenticating();
        let actions = session.handle_transport_error("connection reset");

        assert_eq!(session.state(), SessionState::Failed);
        let cancelled: Vec<_> = actions
            .iter()
            .filter(|a| matches!(a, SessionAction::CancelTimer(_)))
            .collect();
        assert_eq!(cancelled.len(), 2);
        assert_eq!(session.armed_timers().count(), 0);

        // Timers that fire after teardown are ignored.
        assert!(session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::Token)).is_empty());
    }

    #[test]
    fn premature_close_is_transport_failure() {
        let mut session = fetching();
        session.handle_closed();
        assert_eq!(session.state(), SessionState::Failed);
        assert!(matches!(session.failure(), Some(SessionError::Transport(_))));
    }

    #[test]
    fn manual_close_cancels_auto_close() {
        let mut session = fetching();
        session.handle_message(user_added(complete_fields())).unwrap();

        let actions = session.close("operator request");
        assert!(actions.contains(&SessionAction::CancelTimer(SessionTimer::AutoClose)));
        assert!(session.handle_timer(SessionTimer::AutoClose).is_empty());

        session.handle_closed();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn request_ids_strictly_increase() {
        let mut session = authenticating();
        let mut ids = vec![RequestId::new(1)];

        for timer in [
            SessionTimer::LoginAttempt(LoginMethod::Token),
            SessionTimer::LoginAttempt(LoginMethod::LoginWithToken),
        ] {
            ids.extend(sent(&session.handle_timer(timer)).iter().filter_map(|m| m.request_id()));
        }
        let actions = session.handle_message(login_ok(RequestId::new(2))).unwrap();
        ids.extend(sent(&actions).iter().filter_map(|m| m.request_id()));

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]), "ids not increasing: {ids:?}");
    }

    #[test]
    fn start_request_debug_redacts_credential() {
        let debug = format!("{:?}", StartRequest::new(ENDPOINT, "bearer-token"));
        assert!(!debug.contains("bearer-token"));
    }
}
