use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use portico_core::auth::TokenClaims;

/// Echo the verified claims of the caller.
pub async fn whoami(claims: Option<Extension<TokenClaims>>) -> Response {
    match claims {
        Some(Extension(c)) => Json(c).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
