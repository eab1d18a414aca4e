//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use portico_core::{GatewayError, Result};

pub use schema::{AuthSection, GatewayConfig, GatewaySection, SocketSection, WebSocketSection};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PORTICO_CONFIG";
/// Config file used when `PORTICO_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "portico.yaml";

/// Load from `PORTICO_CONFIG`, falling back to `portico.yaml`.
pub fn load_from_env() -> Result<GatewayConfig> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| GatewayError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| GatewayError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
