//! Token signing domains.
//!
//! Application keys and session tokens are compact HS256 JWS strings
//! (`header.payload.signature`, base64url without padding). Each kind is
//! signed with its own secret, so a session token never verifies as an
//! application key and vice versa.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{GatewayError, Result};
use crate::flags::RoleFlags;

type HmacSha256 = Hmac<Sha256>;

/// Minimum secret length accepted for either signing domain.
pub const MIN_SECRET_LEN: usize = 32;

const JWS_ALG: &str = "HS256";

/// Session identity carried by `X-ACCESS-TOKEN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    #[serde(default)]
    pub account_id: String,
    pub subject_id: String,
    #[serde(default)]
    pub subject_type: i32,
    #[serde(default)]
    pub subject_role: RoleFlags,
    #[serde(default)]
    pub status: i32,
    /// Epoch millis; 0 means the token never expires.
    #[serde(default)]
    pub expires_at: i64,
}

impl TokenClaims {
    pub fn new(subject_id: impl Into<String>, subject_role: RoleFlags) -> Self {
        Self {
            account_id: String::new(),
            subject_id: subject_id.into(),
            subject_type: 0,
            subject_role,
            status: 0,
            expires_at: 0,
        }
    }

    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at > 0 && self.expires_at <= now_ms
    }

    /// Copy with expiry slid forward to `now_ms + window`.
    /// Non-expiring tokens stay non-expiring.
    pub fn renewed(&self, now_ms: i64, window: Duration) -> Self {
        let mut next = self.clone();
        if next.expires_at > 0 {
            let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
            next.expires_at = now_ms.saturating_add(window_ms);
        }
        next
    }
}

/// Identity carried by `X-API-KEY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyClaims {
    pub app_name: String,
}

#[derive(Serialize, Deserialize)]
struct JwsHeader {
    alg: String,
    typ: String,
}

/// Issues and verifies application keys and session tokens.
///
/// Holds only the two secrets, so one instance is shared by every in-flight
/// request without locking.
#[derive(Clone)]
pub struct TokenService {
    api_secret: Vec<u8>,
    signing_key: Vec<u8>,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService").finish_non_exhaustive()
    }
}

impl TokenService {
    /// `api_secret` signs application keys, `signing_key` signs session tokens.
    pub fn new(api_secret: &str, signing_key: &str) -> Result<Self> {
        if api_secret.len() < MIN_SECRET_LEN {
            return Err(GatewayError::Config(format!(
                "api secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if signing_key.len() < MIN_SECRET_LEN {
            return Err(GatewayError::Config(format!(
                "signing key must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if api_secret == signing_key {
            tracing::warn!("api secret and signing key are identical; token domains are not separated");
        }
        Ok(Self {
            api_secret: api_secret.as_bytes().to_vec(),
            signing_key: signing_key.as_bytes().to_vec(),
        })
    }

    pub fn create_token(&self, claims: &TokenClaims) -> Result<String> {
        sign(&self.signing_key, claims).map_err(GatewayError::Internal)
    }

    pub fn parse_token(&self, token: &str) -> Result<TokenClaims> {
        self.parse_token_at(token, now_millis())
    }

    /// Parse against an explicit clock (epoch millis).
    pub fn parse_token_at(&self, token: &str, now_ms: i64) -> Result<TokenClaims> {
        let claims: TokenClaims =
            verify(&self.signing_key, token).map_err(GatewayError::AuthTokenInvalid)?;
        if claims.is_expired_at(now_ms) {
            return Err(GatewayError::AuthTokenInvalid("token expired".into()));
        }
        Ok(claims)
    }

    pub fn create_api_key(&self, app_name: &str) -> Result<String> {
        let claims = ApiKeyClaims { app_name: app_name.to_string() };
        sign(&self.api_secret, &claims).map_err(GatewayError::Internal)
    }

    /// Returns the application name the key was issued for.
    pub fn parse_api_key(&self, key: &str) -> Result<String> {
        let claims: ApiKeyClaims =
            verify(&self.api_secret, key).map_err(GatewayError::AuthKeyInvalid)?;
        Ok(claims.app_name)
    }
}

/// Current wall clock in epoch millis.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

fn mac_for(secret: &[u8]) -> std::result::Result<HmacSha256, String> {
    HmacSha256::new_from_slice(secret).map_err(|e| format!("hmac init failed: {e}"))
}

fn sign<T: Serialize>(secret: &[u8], claims: &T) -> std::result::Result<String, String> {
    let header = JwsHeader { alg: JWS_ALG.into(), typ: "JWT".into() };
    let header = serde_json::to_vec(&header).map_err(|e| format!("header encode failed: {e}"))?;
    let payload = serde_json::to_vec(claims).map_err(|e| format!("claims encode failed: {e}"))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    );

    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature}"))
}

fn verify<T: DeserializeOwned>(secret: &[u8], token: &str) -> std::result::Result<T, String> {
    let token = token.trim();
    if token.is_empty() {
        return Err("empty token".into());
    }

    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err("malformed token structure".into());
    };

    let header = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| "malformed token header".to_string())?;
    let header: JwsHeader =
        serde_json::from_slice(&header).map_err(|_| "malformed token header".to_string())?;
    if header.alg != JWS_ALG {
        return Err(format!("unsupported token algorithm: {}", header.alg));
    }

    let signature = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| "malformed token signature".to_string())?;

    let mut mac = mac_for(secret)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| "bad token signature".to_string())?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| "malformed token payload".to_string())?;
    serde_json::from_slice(&payload).map_err(|e| format!("malformed token claims: {e}"))
}
