//! Arbitrary text through the message decoder and into a live session.
//!
//! Decoding must never panic, and whatever decodes must be accepted or
//! rejected by the session without panicking, in every state the session can
//! reach from a successful handshake.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rotor_core::{
    ProtocolSession, SessionConfig,
    session::{LoginMethod, SessionTimer, StartRequest},
};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(message) = rotor_proto::decode_server(text) {
        // Whatever decodes must encode again.
        let _ = rotor_proto::encode_server(&message);
    }

    let mut session = ProtocolSession::new(SessionConfig::default());
    if session.start(StartRequest::new("wss://server/websocket", "token")).is_err() {
        return;
    }
    let _ = session.handle_open();
    let _ = session.handle_text(r#"{"msg":"connected","session":"s"}"#);

    // Feed the input as one message, then line by line.
    let _ = session.handle_text(text);
    for line in text.lines() {
        let _ = session.handle_text(line);
    }

    let _ = session.handle_timer(SessionTimer::LoginAttempt(LoginMethod::Token));
    let _ = session.handle_timer(SessionTimer::AutoClose);
    let _ = session.close("fuzz");
    let _ = session.handle_closed();
});
