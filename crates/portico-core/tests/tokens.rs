//! Token service behaviour across both signing domains.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use portico_core::auth::{now_millis, TokenClaims, TokenService};
use portico_core::{GatewayError, RoleFlags};

const SECRET: &str = "thisIsmyS3cr3t4@nyPurp0seButiTmuSTbelongetThan32bytes";
const SIGNING: &str = "thisIsmyS3cr3tSigningKeyAndItIsAls0MUSTbeLongerTh@n32BytES";

fn service() -> TokenService {
    TokenService::new(SECRET, SIGNING).unwrap()
}

#[test]
fn token_round_trip() {
    let tu = service();
    let td = TokenClaims {
        account_id: "acme".into(),
        subject_id: "subject@email.com".into(),
        subject_type: 2,
        subject_role: RoleFlags::from_bits(4 | 16),
        status: 1,
        expires_at: 0,
    };

    let token = tu.create_token(&td).unwrap();
    let actual = tu.parse_token(&token).unwrap();
    assert_eq!(actual, td);
}

#[test]
fn future_expiry_round_trips() {
    let tu = service();
    let td = TokenClaims::new("alice", RoleFlags::NONE).with_expires_at(now_millis() + 60_000);
    let token = tu.create_token(&td).unwrap();
    assert_eq!(tu.parse_token(&token).unwrap(), td);
}

#[test]
fn past_expiry_is_rejected() {
    let tu = service();
    let td = TokenClaims::new("alice", RoleFlags::NONE).with_expires_at(now_millis() - 1);
    let token = tu.create_token(&td).unwrap();

    let err = tu.parse_token(&token).unwrap_err();
    assert!(matches!(err, GatewayError::AuthTokenInvalid(_)));
    assert_eq!(err.client_code().http_status(), 401);
}

#[test]
fn explicit_clock_controls_expiry() {
    let tu = service();
    let token = tu
        .create_token(&TokenClaims::new("alice", RoleFlags::NONE).with_expires_at(1_000))
        .unwrap();
    assert!(tu.parse_token_at(&token, 999).is_ok());
    assert!(tu.parse_token_at(&token, 1_000).is_err());
}

#[test]
fn api_key_round_trip() {
    let tu = service();
    let key = tu.create_api_key("rest-server-example").unwrap();
    assert_eq!(tu.parse_api_key(&key).unwrap(), "rest-server-example");
}

#[test]
fn key_from_another_deployment_is_rejected() {
    let ours = service();
    let theirs = TokenService::new(
        "another-deployment-api-secret-that-is-long-enough",
        SIGNING,
    )
    .unwrap();

    let key = theirs.create_api_key("console").unwrap();
    let err = ours.parse_api_key(&key).unwrap_err();
    assert_eq!(err.client_code().http_status(), 403);
}
