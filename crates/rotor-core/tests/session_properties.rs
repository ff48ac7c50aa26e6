//! Property-based tests for the windowing math and the session state machine.
//!
//! These tests use proptest to verify invariants hold for all inputs:
//! - Windows are aligned and never report zero remaining time
//! - Window boundaries never move backwards as time advances
//! - Arbitrary interleavings of timers and server messages never produce
//!   more than three login attempts
//! - Request ids are strictly increasing

use proptest::prelude::*;
use rotor_core::{
    session::{
        LoginMethod, ProtocolSession, SessionAction, SessionConfig, SessionState, SessionTimer,
        StartRequest,
    },
    window::{self, RefreshInterval},
};
use rotor_proto::{ClientMessage, RequestId, ServerMessage};
use serde_json::json;

const USER_PUSH: &str = r#"{"msg":"added","collection":"users","id":"u1","fields":{"profile":{"gestixiIds":["g1"]},"qrCodeTokens":{"hashed":"h1"}}}"#;

fn interval_strategy() -> impl Strategy<Value = RefreshInterval> {
    (1u64..=3600).prop_map(|secs| RefreshInterval::from_secs(secs).unwrap())
}

// Up to year ~2500 in milliseconds
fn timestamp_strategy() -> impl Strategy<Value = u64> {
    0u64..=17_000_000_000_000
}

/// Events the transport or the timer wheel may deliver at any moment.
#[derive(Debug, Clone)]
enum Event {
    Ping,
    Timer(SessionTimer),
    LoginReply { id: u64, accept: bool },
    UserPush,
    Garbage,
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Ping),
        Just(Event::Timer(SessionTimer::LoginAttempt(LoginMethod::Token))),
        Just(Event::Timer(SessionTimer::LoginAttempt(LoginMethod::LoginWithToken))),
        Just(Event::Timer(SessionTimer::AutoClose)),
        (1u64..=8, any::<bool>()).prop_map(|(id, accept)| Event::LoginReply { id, accept }),
        Just(Event::UserPush),
        Just(Event::Garbage),
    ]
}

fn authenticating() -> (ProtocolSession, Vec<SessionAction>) {
    let mut session = ProtocolSession::new(SessionConfig::default());
    let mut actions = session
        .start(StartRequest::new("wss://example.test/websocket", "bearer"))
        .unwrap();
    actions.extend(session.handle_open().unwrap());
    actions.extend(
        session.handle_message(ServerMessage::Connected { session: "abc".to_string() }).unwrap(),
    );
    (session, actions)
}

fn deliver(session: &mut ProtocolSession, event: Event) -> Vec<SessionAction> {
    let result = match event {
        Event::Ping => session.handle_message(ServerMessage::Ping { id: None }),
        Event::Timer(timer) => Ok(session.handle_timer(timer)),
        Event::LoginReply { id, accept } => {
            let (result, error) = if accept {
                (Some(json!({ "id": "u1", "token": "t1" })), None)
            } else {
                (None, Some(json!("forbidden")))
            };
            session.handle_message(ServerMessage::Result { id: RequestId::new(id), result, error })
        },
        Event::UserPush => session.handle_text(USER_PUSH),
        Event::Garbage => session.handle_text("not json at all"),
    };
    result.unwrap_or_default()
}

fn login_count(actions: &[SessionAction]) -> usize {
    actions
        .iter()
        .filter(|a| {
            matches!(
                a,
                SessionAction::Send(ClientMessage::Method { method, .. })
                    if method == "login" || method == "_loginWithToken"
            )
        })
        .count()
}

#[test]
fn prop_window_is_aligned_and_never_empty() {
    proptest!(|(interval in interval_strategy(), ts in timestamp_strategy())| {
        let sample = window::window_for(interval, ts);

        prop_assert!(sample.remaining_ms > 0);
        prop_assert!(sample.remaining_ms <= interval.as_millis());
        prop_assert_eq!(sample.window.boundary_secs % interval.as_secs(), 0);
        prop_assert!(sample.window.contains(ts));
        prop_assert_eq!(
            sample.window.window_start_ms + interval.as_millis(),
            sample.window.end_ms()
        );
    });
}

#[test]
fn prop_boundaries_never_move_backwards() {
    proptest!(|(
        interval in interval_strategy(),
        ts in timestamp_strategy(),
        delta in 0u64..=100_000_000,
    )| {
        let earlier = window::window_for(interval, ts);
        let later = window::window_for(interval, ts + delta);

        prop_assert!(later.window.boundary_secs >= earlier.window.boundary_secs);
        if delta < earlier.remaining_ms {
            prop_assert_eq!(later.window, earlier.window);
        } else {
            prop_assert!(later.window.boundary_secs > earlier.window.boundary_secs);
        }
    });
}

#[test]
fn prop_at_most_three_login_attempts() {
    proptest!(|(events in prop::collection::vec(event_strategy(), 0..40))| {
        let (mut session, mut actions) = authenticating();

        for event in events {
            actions.extend(deliver(&mut session, event));
        }

        prop_assert!(login_count(&actions) <= LoginMethod::ALL.len());
        if session.state() != SessionState::Authenticating {
            // Nothing left to fire once the race is decided.
            let armed_logins = session
                .armed_timers()
                .filter(|t| matches!(t, SessionTimer::LoginAttempt(_)))
                .count();
            prop_assert_eq!(armed_logins, 0);
        }
    });
}

#[test]
fn prop_request_ids_strictly_increase() {
    proptest!(|(events in prop::collection::vec(event_strategy(), 0..40))| {
        let (mut session, mut actions) = authenticating();

        for event in events {
            actions.extend(deliver(&mut session, event));
        }

        let ids: Vec<RequestId> = actions
            .iter()
            .filter_map(|a| match a {
                SessionAction::Send(message) => message.request_id(),
                _ => None,
            })
            .collect();
        prop_assert!(ids.windows(2).all(|pair| pair[0] < pair[1]), "ids: {:?}", ids);
        prop_assert_eq!(ids.first().copied(), Some(RequestId::FIRST));
    });
}

#[test]
fn prop_reply_order_does_not_matter() {
    // One of the three attempts is accepted; replies arrive in any order.
    let orders = Just(vec![1u64, 2, 3]).prop_shuffle();
    proptest!(|(order in orders, accepted in 1u64..=3)| {
        let (mut session, _) = authenticating();
        session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::Token));
        session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::LoginWithToken));

        for id in order {
            deliver(&mut session, Event::LoginReply { id, accept: id == accepted });
        }

        prop_assert_eq!(session.state(), SessionState::FetchingProfile);
        prop_assert_eq!(session.user_id(), Some("u1"));
    });
}
