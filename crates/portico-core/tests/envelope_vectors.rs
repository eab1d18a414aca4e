//! Envelope decoding vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde::Deserialize;
use serde_json::json;

use portico_core::protocol::{JsonDecoder, MessageDecoder, MessageHeader};

mod vector_loader;
use vector_loader::load;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetPlaneInfo {
    plane_id: String,
}

fn decoder() -> JsonDecoder {
    JsonDecoder::new().register::<GetPlaneInfo>(1)
}

#[test]
fn envelope_vectors() {
    let files = [
        "envelope_ping.json",
        "envelope_typed.json",
        "envelope_raw.json",
        "envelope_binary_json.json",
        "envelope_missing_opcode.json",
        "envelope_not_json.json",
        "envelope_typed_mismatch.json",
    ];
    let dec = decoder();

    for f in files {
        let v = load(f);
        let raw = v.frame.decode();
        let res = dec.decode(&raw);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.client_code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let env = res.expect("expected ok envelope");
        let ex = v.expect.expect("missing expect block");

        assert_eq!(env.op_code() as i64, ex["op_code"].as_i64().unwrap(), "vector={}", v.description);
        assert_eq!(env.message_id(), ex["message_id"].as_u64().unwrap(), "vector={}", v.description);
        assert_eq!(env.session_id(), ex["session_id"].as_str().unwrap(), "vector={}", v.description);

        match ex["body"].as_str().unwrap() {
            "ping" => assert!(env.is_ping(), "vector={}", v.description),
            "typed" => {
                let typed = env.typed::<GetPlaneInfo>().expect("typed body");
                assert_eq!(typed.plane_id, ex["plane_id"].as_str().unwrap(), "vector={}", v.description);
            }
            "raw" => assert_eq!(env.raw().unwrap().as_ref(), raw.as_slice(), "vector={}", v.description),
            other => panic!("unknown body kind {other}"),
        }
    }
}

#[test]
fn missing_opcode_is_keepalive() {
    let env = decoder().decode(br#"{"MessageId":1}"#).unwrap();
    assert_eq!(env.op_code(), 0);
    assert_eq!(env.message_id(), 1);
    assert!(env.is_ping());

    assert!(decoder().decode(b"42").is_err());
}

#[test]
fn ping_factory_overrides_keepalive() {
    #[derive(Debug, Deserialize)]
    struct Ping {}

    let dec = JsonDecoder::new().register::<Ping>(0);
    let env = dec.decode(br#"{"OpCode":0}"#).unwrap();
    assert!(!env.is_ping());
    assert!(env.typed::<Ping>().is_some());
}

#[test]
fn encode_merges_header_over_fields() {
    let dec = JsonDecoder::new();
    let header = MessageHeader::new(3).with_message_id(9).with_session_id("s");
    let bytes = dec
        .encode(&header, json!({ "Text": "hi", "OpCode": 99 }))
        .unwrap();

    let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["OpCode"], 3);
    assert_eq!(v["MessageId"], 9);
    assert_eq!(v["SessionId"], "s");
    assert_eq!(v["Text"], "hi");

    let back = dec.decode(&bytes).unwrap();
    assert_eq!(back.header, header);
}

#[test]
fn encode_rejects_non_object_fields() {
    let dec = JsonDecoder::new();
    let err = dec.encode(&MessageHeader::new(1), json!([1, 2])).unwrap_err();
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}
