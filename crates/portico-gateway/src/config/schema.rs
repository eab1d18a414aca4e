use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use portico_core::auth::MIN_SECRET_LEN;
use portico_core::{GatewayError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    pub auth: AuthSection,

    #[serde(default)]
    pub websocket: WebSocketSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GatewayError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.auth.validate()?;
        self.websocket.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Expected `appName` inside `X-API-KEY`; empty accepts any valid key.
    #[serde(default)]
    pub app_name: String,

    /// Value of the `X-API-VERSION` response header.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Response headers applied after the CORS defaults (overrides them).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    #[serde(default)]
    pub socket: SocketSection,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            app_name: String::new(),
            api_version: default_api_version(),
            headers: BTreeMap::new(),
            enable_metrics: true,
            socket: SocketSection::default(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(GatewayError::Config(format!(
                "gateway.listen must be a socket address, got {:?}",
                self.listen
            )));
        }
        for (name, value) in &self.headers {
            if axum::http::HeaderName::try_from(name.as_str()).is_err()
                || axum::http::HeaderValue::try_from(value.as_str()).is_err()
            {
                return Err(GatewayError::Config(format!(
                    "gateway.headers contains an invalid header: {name}"
                )));
            }
        }
        self.socket.validate()
    }
}

/// Options applied to the listening socket; accepted sockets inherit them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocketSection {
    #[serde(default = "default_true")]
    pub nodelay: bool,

    #[serde(default = "default_buffer_bytes")]
    pub recv_buffer_bytes: usize,

    #[serde(default = "default_buffer_bytes")]
    pub send_buffer_bytes: usize,

    #[serde(default = "default_true")]
    pub linger_zero: bool,
}

impl Default for SocketSection {
    fn default() -> Self {
        Self {
            nodelay: true,
            recv_buffer_bytes: default_buffer_bytes(),
            send_buffer_bytes: default_buffer_bytes(),
            linger_zero: true,
        }
    }
}

impl SocketSection {
    pub fn validate(&self) -> Result<()> {
        let range = 4096..=(64 * 1024 * 1024);
        if !range.contains(&self.recv_buffer_bytes) || !range.contains(&self.send_buffer_bytes) {
            return Err(GatewayError::Config(
                "gateway.socket buffer sizes must be between 4096 and 67108864".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    /// Secret signing application keys.
    pub api_secret: String,

    /// Secret signing session tokens.
    pub signing_key: String,

    #[serde(default = "default_renewal_window_ms")]
    pub renewal_window_ms: u64,

    /// Paths ending with one of these bypass both guards.
    #[serde(default = "default_public_suffixes")]
    pub public_suffixes: Vec<String>,
}

impl AuthSection {
    pub fn validate(&self) -> Result<()> {
        if self.api_secret.len() < MIN_SECRET_LEN || self.signing_key.len() < MIN_SECRET_LEN {
            return Err(GatewayError::Config(format!(
                "auth.api_secret and auth.signing_key must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if !(60_000..=86_400_000).contains(&self.renewal_window_ms) {
            return Err(GatewayError::Config(
                "auth.renewal_window_ms must be between 60000 and 86400000".into(),
            ));
        }
        if self.public_suffixes.iter().any(|s| s.is_empty()) {
            return Err(GatewayError::Config(
                "auth.public_suffixes must not contain empty entries".into(),
            ));
        }
        Ok(())
    }

    pub fn renewal_window(&self) -> Duration {
        Duration::from_millis(self.renewal_window_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebSocketSection {
    /// Per-group admission limit.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Per-connection outbound queue depth.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Copy upgrade request headers into the connection params (lowercase
    /// names, repeated values joined with ", "). Headers win over query params.
    #[serde(default)]
    pub inject_headers: bool,
}

impl Default for WebSocketSection {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            outbound_queue: default_outbound_queue(),
            write_timeout_ms: default_write_timeout_ms(),
            max_message_bytes: default_max_message_bytes(),
            inject_headers: false,
        }
    }
}

impl WebSocketSection {
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(GatewayError::Config(
                "websocket.max_connections must be greater than 0".into(),
            ));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(GatewayError::Config(
                "websocket.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(GatewayError::Config(
                "websocket.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(GatewayError::Config(
                "websocket.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(GatewayError::Config(
                "websocket.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        if !(100..=600000).contains(&self.write_timeout_ms) {
            return Err(GatewayError::Config(
                "websocket.write_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if !(1024..=(16 * 1024 * 1024)).contains(&self.max_message_bytes) {
            return Err(GatewayError::Config(
                "websocket.max_message_bytes must be between 1024 and 16777216".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_api_version() -> String {
    "1.0.0".into()
}
fn default_true() -> bool {
    true
}
fn default_buffer_bytes() -> usize {
    1024 * 1024
}
fn default_renewal_window_ms() -> u64 {
    30 * 60 * 1000
}
fn default_public_suffixes() -> Vec<String> {
    vec!["/favicon.ico".into(), "/com.chrome.devtools.json".into()]
}
fn default_max_connections() -> usize {
    10_000
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_write_timeout_ms() -> u64 {
    60000
}
fn default_max_message_bytes() -> usize {
    1024 * 1024
}
