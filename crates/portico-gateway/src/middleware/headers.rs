//! Response header middleware: CORS, cache suppression, API version.

use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::app_state::GatewayContext;
use crate::middleware::API_VERSION_HEADER;

const ALLOW_HEADERS: &str = "Content-Type, Content-Length, Accept-Encoding, X-CSRF-Token, \
X-API-KEY, X-ACCESS-TOKEN, X-TIMEZONE, accept, origin, Cache-Control, X-Requested-With, \
Content-Disposition, Content-Filename";
const EXPOSE_HEADERS: &str = "X-API-KEY, X-ACCESS-TOKEN, X-TIMEZONE, X-API-VERSION, \
Content-Disposition, Content-Filename";
const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS, HEAD";

fn apply_cors_defaults(h: &mut HeaderMap) {
    h.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    h.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
    h.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static(EXPOSE_HEADERS));
    h.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    h.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
}

/// Answers `OPTIONS` with 204 and decorates every response with CORS
/// headers, then the configured custom headers.
pub async fn cors(State(ctx): State<GatewayContext>, req: Request, next: Next) -> Response {
    let mut res = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    let h = res.headers_mut();
    apply_cors_defaults(h);
    for (name, value) in ctx.custom_headers() {
        h.insert(name.clone(), value.clone());
    }
    res
}

pub async fn no_cache(req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    res.headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
    res
}

pub async fn api_version(State(ctx): State<GatewayContext>, req: Request, next: Next) -> Response {
    let mut res = next.run(req).await;
    res.headers_mut().insert(API_VERSION_HEADER, ctx.api_version().clone());
    res
}
