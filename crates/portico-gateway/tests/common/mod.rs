#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use portico_core::auth::{TokenClaims, TokenService};
use portico_gateway::config::{self, GatewayConfig};

pub const API_SECRET: &str = "thisIsmyS3cr3t4@nyPurp0seButiTmuSTbelongetThan32bytes";
pub const SIGNING_KEY: &str = "thisIsmyS3cr3tSigningKeyAndItIsAls0MUSTbeLongerTh@n32BytES";
pub const APP_NAME: &str = "console";

pub const SALES: u32 = 1;
pub const MANAGEMENT: u32 = 16;

/// Valid config with optional extra YAML appended to the `gateway` and
/// `websocket` sections.
pub fn config_with(gateway_extra: &str, websocket_extra: &str) -> GatewayConfig {
    let yaml = format!(
        r#"
version: 1
gateway:
  app_name: "{APP_NAME}"
  api_version: "2.1.0"
{gateway_extra}
auth:
  api_secret: "{API_SECRET}"
  signing_key: "{SIGNING_KEY}"
websocket:
  ping_interval_ms: 5000
  idle_timeout_ms: 10000
{websocket_extra}
"#
    );
    config::load_from_str(&yaml).expect("test config must load")
}

pub fn config() -> GatewayConfig {
    config_with("", "")
}

pub fn tokens() -> TokenService {
    TokenService::new(API_SECRET, SIGNING_KEY).unwrap()
}

pub fn api_key() -> String {
    tokens().create_api_key(APP_NAME).unwrap()
}

pub fn token(claims: &TokenClaims) -> String {
    tokens().create_token(claims).unwrap()
}
