//! Shared error type across Portico crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Missing, unparsable, or foreign application key.
    AuthKeyInvalid,
    /// Missing, unparsable, or expired session token.
    AuthTokenInvalid,
    /// Valid token whose role bitmask does not intersect the route roles.
    AuthRoleDenied,
    /// Malformed inbound message.
    BadRequest,
    /// Connection admission refused.
    CapacityExceeded,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::AuthKeyInvalid => "AUTH_KEY_INVALID",
            ClientCode::AuthTokenInvalid => "AUTH_TOKEN_INVALID",
            ClientCode::AuthRoleDenied => "AUTH_ROLE_DENIED",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::CapacityExceeded => "CAPACITY_EXCEEDED",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// HTTP status code a gateway should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            ClientCode::AuthKeyInvalid => 403,
            ClientCode::AuthTokenInvalid | ClientCode::AuthRoleDenied => 401,
            ClientCode::BadRequest => 400,
            ClientCode::CapacityExceeded => 429,
            ClientCode::Internal => 500,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid API key: {0}")]
    AuthKeyInvalid(String),
    #[error("invalid auth token: {0}")]
    AuthTokenInvalid(String),
    #[error("user role not authorized: {0}")]
    AuthRoleDenied(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("connection capacity exceeded (max {max})")]
    CapacityExceeded { max: usize },
    #[error("transport: {0}")]
    Transport(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            GatewayError::AuthKeyInvalid(_) => ClientCode::AuthKeyInvalid,
            GatewayError::AuthTokenInvalid(_) => ClientCode::AuthTokenInvalid,
            GatewayError::AuthRoleDenied(_) => ClientCode::AuthRoleDenied,
            GatewayError::Decode(_) | GatewayError::BadRequest(_) => ClientCode::BadRequest,
            GatewayError::CapacityExceeded { .. } => ClientCode::CapacityExceeded,
            GatewayError::Transport(_) | GatewayError::Config(_) | GatewayError::Internal(_) => {
                ClientCode::Internal
            }
        }
    }

    /// True for the auth taxonomy (key, token, role).
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            GatewayError::AuthKeyInvalid(_)
                | GatewayError::AuthTokenInvalid(_)
                | GatewayError::AuthRoleDenied(_)
        )
    }
}
