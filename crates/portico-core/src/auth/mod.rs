//! Caller identity: application keys and session tokens.

pub mod token;

pub use token::{now_millis, ApiKeyClaims, TokenClaims, TokenService, MIN_SECRET_LEN};
