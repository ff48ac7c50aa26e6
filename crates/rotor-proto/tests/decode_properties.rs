//! Property-based tests for message decoding.
//!
//! Server input is untrusted. Decoding must never panic, and everything the
//! client encodes must decode back to the same message.

use proptest::prelude::*;
use rotor_proto::{ClientMessage, RequestId, decode_client, decode_server, encode_client};
use serde_json::json;

fn client_message_strategy() -> impl Strategy<Value = ClientMessage> {
    let id = (1u64..=u64::MAX).prop_map(RequestId::new);
    let text = "[ -~]{0,24}";

    prop_oneof![
        Just(ClientMessage::connect()),
        (id.clone(), text, text).prop_map(|(id, method, arg)| ClientMessage::method(
            id,
            method,
            vec![json!({ "resume": arg })]
        )),
        (id, text, text).prop_map(|(id, name, arg)| ClientMessage::sub(id, name, vec![json!(arg)])),
        proptest::option::of(text).prop_map(ClientMessage::pong),
    ]
}

proptest! {
    #[test]
    fn prop_decode_server_never_panics(text in "\\PC{0,256}") {
        let _ = decode_server(&text);
    }

    #[test]
    fn prop_decode_server_never_panics_on_objects(kind in "[a-z]{0,12}", body in "[ -~]{0,64}") {
        let text = format!(r#"{{"msg":"{kind}","id":"{body}"}}"#);
        let _ = decode_server(&text);
    }

    #[test]
    fn prop_client_messages_survive_encoding(message in client_message_strategy()) {
        let text = encode_client(&message).expect("encoding should succeed");
        prop_assert!(!text.contains('\n'));
        prop_assert_eq!(decode_client(&text).expect("decoding should succeed"), message);
    }
}
