//! HTTP middleware chain.
//!
//! Outermost first: `cors`, `api_version`, `no_cache`, `api_key_guard`,
//! `token_guard`. The guards consult the route table; rejections carry a
//! JSON `{ "code", "message" }` body.

pub mod auth;
pub mod headers;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use portico_core::GatewayError;

pub use auth::{api_key_guard, check_api_key, check_token, is_public_path, token_guard};
pub use headers::{api_version, cors, no_cache};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";
pub const API_VERSION_HEADER: &str = "x-api-version";

/// Error response with the stable client code and a readable reason.
pub fn reject(err: &GatewayError) -> Response {
    let code = err.client_code();
    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({ "code": code.as_str(), "message": err.to_string() });
    (status, Json(body)).into_response()
}
