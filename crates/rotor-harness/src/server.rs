//! Scripted DDP peer.
//!
//! [`ScriptedServer`] answers client messages according to a
//! [`ServerScript`]. It is pure: it maps one client message to the server
//! messages that answer it, so the same script drives both the in-memory
//! scenario framework and a Turmoil host.

use rotor_core::session::LoginMethod;
use rotor_proto::{ClientMessage, RequestId, ServerMessage};
use serde_json::{Map, Value, json};

const LOGIN_REJECTED: &str = "You've been logged out by the server";

/// How the scripted server behaves.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerScript {
    /// Session id sent in `connected`
    pub session_id: String,
    /// Refuse the protocol version with `failed`
    pub refuse_version: bool,
    /// The one login variant the server accepts; `None` rejects all
    pub accepted_login: Option<LoginMethod>,
    /// User id returned by a successful login
    pub user_id: String,
    /// Resume token returned by a successful login
    pub login_token: String,
    /// Collection user documents are pushed into
    pub collection: String,
    /// Fields of the user document pushed as `added` on subscribe
    pub initial_fields: Map<String, Value>,
    /// Fields pushed as `changed` after the first repair call
    pub repaired_fields: Option<Map<String, Value>>,
    /// Result of the profile RPC
    pub profile_result: Value,
    /// Result of the repair RPC; `Null` sends a bare acknowledgment
    pub repair_result: Value,
    /// Send a keepalive `ping` before every answered RPC
    pub ping_before_replies: bool,
}

impl Default for ServerScript {
    fn default() -> Self {
        Self {
            session_id: "abc".to_string(),
            refuse_version: false,
            accepted_login: Some(LoginMethod::Resume),
            user_id: "u1".to_string(),
            login_token: "t1".to_string(),
            collection: "users".to_string(),
            initial_fields: object(json!({
                "profile": { "gestixiIds": ["g1"] },
                "qrCodeTokens": { "arkose": { "hashed": "h1" } }
            })),
            repaired_fields: None,
            profile_result: Value::Null,
            repair_result: Value::Null,
            ping_before_replies: false,
        }
    }
}

impl ServerScript {
    /// Accept only `method`.
    #[must_use]
    pub fn accepting(mut self, method: LoginMethod) -> Self {
        self.accepted_login = Some(method);
        self
    }

    /// Reject every login attempt.
    #[must_use]
    pub fn rejecting_all_logins(mut self) -> Self {
        self.accepted_login = None;
        self
    }

    /// Push `fields` as the initial user document.
    #[must_use]
    pub fn with_user_fields(mut self, fields: Value) -> Self {
        self.initial_fields = object(fields);
        self
    }

    /// Push `fields` as a `changed` message when the repair RPC is called.
    #[must_use]
    pub fn with_repair(mut self, fields: Value) -> Self {
        self.repaired_fields = Some(object(fields));
        self
    }

    /// Return `result` from the profile RPC.
    #[must_use]
    pub fn with_profile_result(mut self, result: Value) -> Self {
        self.profile_result = result;
        self
    }

    /// Return `result` from the repair RPC.
    #[must_use]
    pub fn with_repair_result(mut self, result: Value) -> Self {
        self.repair_result = result;
        self
    }
}

/// A DDP server that follows a [`ServerScript`].
#[derive(Debug, Clone)]
pub struct ScriptedServer {
    script: ServerScript,
    received: Vec<ClientMessage>,
    repaired: bool,
    pings_sent: u64,
}

impl ScriptedServer {
    /// Create a server following `script`.
    pub fn new(script: ServerScript) -> Self {
        Self { script, received: Vec::new(), repaired: false, pings_sent: 0 }
    }

    /// Every client message received, in arrival order.
    pub fn received(&self) -> &[ClientMessage] {
        &self.received
    }

    /// Login variants attempted, in arrival order.
    pub fn login_attempts(&self) -> Vec<LoginMethod> {
        self.received.iter().filter_map(login_method).collect()
    }

    /// Number of `pong` replies received.
    pub fn pongs_received(&self) -> usize {
        self.received.iter().filter(|m| matches!(m, ClientMessage::Pong { .. })).count()
    }

    /// Number of repair RPCs received.
    pub fn repair_calls(&self) -> usize {
        self.received
            .iter()
            .filter(|m| {
                matches!(m, ClientMessage::Method { method, .. }
                    if method == "_users.repairGestixiAssociation")
            })
            .count()
    }

    /// Answer one client message.
    pub fn respond(&mut self, message: &ClientMessage) -> Vec<ServerMessage> {
        self.received.push(message.clone());

        match message {
            ClientMessage::Connect { .. } if self.script.refuse_version => {
                vec![ServerMessage::Failed { version: Some("2".to_string()) }]
            },
            ClientMessage::Connect { .. } => {
                vec![ServerMessage::Connected { session: self.script.session_id.clone() }]
            },
            ClientMessage::Method { method, id, .. } => {
                let mut replies = self.keepalive();
                replies.extend(self.answer_method(method, *id, message));
                replies
            },
            ClientMessage::Sub { id, .. } => {
                let mut replies = self.keepalive();
                replies.push(ServerMessage::Added {
                    collection: self.script.collection.clone(),
                    id: Some(self.script.user_id.clone()),
                    fields: Some(self.script.initial_fields.clone()),
                });
                replies.push(ServerMessage::Ready { subs: vec![id.to_string()] });
                replies
            },
            ClientMessage::Pong { .. } => vec![],
        }
    }

    fn answer_method(
        &mut self,
        method: &str,
        id: RequestId,
        message: &ClientMessage,
    ) -> Vec<ServerMessage> {
        if let Some(attempt) = login_method(message) {
            return vec![self.answer_login(attempt, id)];
        }

        match method {
            "users.get" => vec![ServerMessage::Result {
                id,
                result: Some(self.script.profile_result.clone()),
                error: None,
            }],
            "_users.repairGestixiAssociation" => {
                let result = Some(self.script.repair_result.clone()).filter(|r| !r.is_null());
                let mut replies = vec![ServerMessage::Result { id, result, error: None }];
                if let Some(fields) = self.script.repaired_fields.clone() {
                    if !std::mem::replace(&mut self.repaired, true) {
                        replies.push(ServerMessage::Changed {
                            collection: self.script.collection.clone(),
                            id: Some(self.script.user_id.clone()),
                            fields: Some(fields),
                            cleared: None,
                        });
                    }
                }
                replies
            },
            other => {
                let reason = format!("Method '{other}' not found");
                vec![ServerMessage::Result {
                    id,
                    result: None,
                    error: Some(json!({ "error": 404, "reason": reason })),
                }]
            },
        }
    }

    fn answer_login(&self, attempt: LoginMethod, id: RequestId) -> ServerMessage {
        if self.script.accepted_login == Some(attempt) {
            ServerMessage::Result {
                id,
                result: Some(json!({
                    "id": self.script.user_id,
                    "token": self.script.login_token,
                })),
                error: None,
            }
        } else {
            ServerMessage::Result {
                id,
                result: None,
                error: Some(json!({ "error": 403, "reason": LOGIN_REJECTED })),
            }
        }
    }

    fn keepalive(&mut self) -> Vec<ServerMessage> {
        if !self.script.ping_before_replies {
            return vec![];
        }
        self.pings_sent += 1;
        vec![ServerMessage::Ping { id: Some(format!("k{}", self.pings_sent)) }]
    }
}

/// Which login variant a client message is, if any.
fn login_method(message: &ClientMessage) -> Option<LoginMethod> {
    let ClientMessage::Method { method, params, .. } = message else {
        return None;
    };
    match (method.as_str(), params.first()) {
        ("_loginWithToken", _) => Some(LoginMethod::LoginWithToken),
        ("login", Some(first)) if first.get("resume").is_some() => Some(LoginMethod::Resume),
        ("login", Some(first)) if first.get("token").is_some() => Some(LoginMethod::Token),
        _ => None,
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_scripted_login() {
        let mut server = ScriptedServer::new(ServerScript::default().accepting(LoginMethod::Token));

        let replies = server.respond(&ClientMessage::method(
            RequestId::new(1),
            "login",
            LoginMethod::Resume.params("tok"),
        ));
        assert!(matches!(&replies[..], [ServerMessage::Result { error: Some(_), .. }]));

        let replies = server.respond(&ClientMessage::method(
            RequestId::new(2),
            "login",
            LoginMethod::Token.params("tok"),
        ));
        assert!(matches!(&replies[..], [ServerMessage::Result { result: Some(_), .. }]));

        assert_eq!(server.login_attempts(), vec![LoginMethod::Resume, LoginMethod::Token]);
    }

    #[test]
    fn subscribe_pushes_document_then_ready() {
        let mut server = ScriptedServer::new(ServerScript::default());
        let replies =
            server.respond(&ClientMessage::sub(RequestId::new(2), "userData", vec![json!("u1")]));

        assert!(matches!(&replies[..], [
            ServerMessage::Added { .. },
            ServerMessage::Ready { subs }
        ] if subs == &["2".to_string()]));
    }

    #[test]
    fn repair_pushes_changed_once() {
        let mut server = ScriptedServer::new(
            ServerScript::default().with_repair(json!({ "qrCodeTokens": { "hashed": "h2" } })),
        );
        let repair =
            ClientMessage::method(RequestId::new(4), "_users.repairGestixiAssociation", vec![]);

        assert_eq!(server.respond(&repair).len(), 2);
        assert_eq!(server.respond(&repair).len(), 1);
        assert_eq!(server.repair_calls(), 2);
    }
}
