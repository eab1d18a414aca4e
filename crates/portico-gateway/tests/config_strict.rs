#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use portico_gateway::config;

const SECRETS: &str = r#"
auth:
  api_secret: "thisIsmyS3cr3t4@nyPurp0seButiTmuSTbelongetThan32bytes"
  signing_key: "thisIsmyS3cr3tSigningKeyAndItIsAls0MUSTbeLongerTh@n32BytES"
"#;

#[test]
fn deny_unknown_fields_nested() {
    let bad = format!(
        r#"
version: 1
gateway:
  listen: "0.0.0.0:8080"
  sockett: {{ nodelay: true }} # typo should fail
{SECRETS}"#
    );

    let err = config::load_from_str(&bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let ok = format!("version: 1\n{SECRETS}");
    let cfg = config::load_from_str(&ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:8080");
    assert_eq!(cfg.auth.renewal_window_ms, 1_800_000);
    assert_eq!(cfg.auth.public_suffixes, vec!["/favicon.ico", "/com.chrome.devtools.json"]);
    assert_eq!(cfg.websocket.max_connections, 10_000);
    assert_eq!(cfg.websocket.write_timeout_ms, 60_000);
    assert_eq!(cfg.gateway.socket.recv_buffer_bytes, 1024 * 1024);
    assert!(cfg.gateway.socket.linger_zero);
}

#[test]
fn unsupported_version() {
    let bad = format!("version: 2\n{SECRETS}");
    let err = config::load_from_str(&bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "INTERNAL");
}

#[test]
fn short_secret_rejected() {
    let bad = r#"
version: 1
auth:
  api_secret: "short"
  signing_key: "thisIsmyS3cr3tSigningKeyAndItIsAls0MUSTbeLongerTh@n32BytES"
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn idle_must_exceed_ping() {
    let bad = format!(
        "version: 1\n{SECRETS}websocket:\n  ping_interval_ms: 30000\n  idle_timeout_ms: 20000\n"
    );
    let err = config::load_from_str(&bad).expect_err("must fail");
    assert!(err.to_string().contains("idle_timeout_ms"));
}

#[test]
fn invalid_custom_header_rejected() {
    let bad = format!(
        "version: 1\n{SECRETS}gateway:\n  headers:\n    \"bad header\": \"x\"\n"
    );
    assert!(config::load_from_str(&bad).is_err());
}
