//! Application-key and session-token guards.
//!
//! Both guards are bypassed for `OPTIONS`, for public path suffixes, and for
//! routes whose skip flags contain their bit. The token guard places the
//! verified claims in the request extensions and, for expiring tokens,
//! returns a renewed token in `X-ACCESS-TOKEN`.

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::Response;

use portico_core::auth::{now_millis, TokenClaims, TokenService};
use portico_core::{GatewayError, Result, RoleFlags, SkipFlags};

use crate::app_state::GatewayContext;
use crate::middleware::{reject, ACCESS_TOKEN_HEADER, API_KEY_HEADER};

/// True when `path` ends with one of the public suffixes.
pub fn is_public_path(path: &str, suffixes: &[String]) -> bool {
    suffixes.iter().any(|s| path.ends_with(s.as_str()))
}

/// Verify an `X-API-KEY` value. An empty `app_name` accepts any valid key.
pub fn check_api_key(tokens: &TokenService, app_name: &str, key: Option<&str>) -> Result<String> {
    let key = key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| GatewayError::AuthKeyInvalid("missing X-API-KEY".into()))?;
    let issued_for = tokens.parse_api_key(key)?;
    if !app_name.is_empty() && issued_for != app_name {
        return Err(GatewayError::AuthKeyInvalid(format!(
            "key issued for application {issued_for:?}"
        )));
    }
    Ok(issued_for)
}

/// Verify an `X-ACCESS-TOKEN` value and the route's role mask.
pub fn check_token(
    tokens: &TokenService,
    token: Option<&str>,
    roles: RoleFlags,
    now_ms: i64,
) -> Result<TokenClaims> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GatewayError::AuthTokenInvalid("missing X-ACCESS-TOKEN".into()))?;
    let claims = tokens.parse_token_at(token, now_ms)?;
    if !roles.admits(claims.subject_role) {
        return Err(GatewayError::AuthRoleDenied(format!(
            "subject role {} does not intersect route roles {}",
            claims.subject_role, roles
        )));
    }
    Ok(claims)
}

fn header_str<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn bypassed(ctx: &GatewayContext, req: &Request, flag: SkipFlags) -> bool {
    req.method() == Method::OPTIONS
        || is_public_path(req.uri().path(), &ctx.cfg().auth.public_suffixes)
        || ctx.routes().resolve_skip(req.method(), req.uri().path()).contains(flag)
}

fn rejected(ctx: &GatewayContext, req: &Request, err: &GatewayError) -> Response {
    let code = err.client_code().as_str();
    ctx.metrics().auth_rejections.inc(&[("code", code)]);
    tracing::warn!(
        method = %req.method(),
        path = %req.uri().path(),
        code,
        reason = %err,
        "request rejected"
    );
    reject(err)
}

pub async fn api_key_guard(State(ctx): State<GatewayContext>, req: Request, next: Next) -> Response {
    if bypassed(&ctx, &req, SkipFlags::API_KEY) {
        return next.run(req).await;
    }

    match check_api_key(ctx.tokens(), &ctx.cfg().gateway.app_name, header_str(&req, API_KEY_HEADER)) {
        Ok(_) => next.run(req).await,
        Err(e) => rejected(&ctx, &req, &e),
    }
}

pub async fn token_guard(State(ctx): State<GatewayContext>, mut req: Request, next: Next) -> Response {
    if bypassed(&ctx, &req, SkipFlags::TOKEN) {
        return next.run(req).await;
    }

    let roles = ctx.routes().resolve_role(req.method(), req.uri().path());
    let now = now_millis();
    let claims = match check_token(ctx.tokens(), header_str(&req, ACCESS_TOKEN_HEADER), roles, now) {
        Ok(c) => c,
        Err(e) => return rejected(&ctx, &req, &e),
    };

    let renewed = if claims.expires_at > 0 {
        let next_claims = claims.renewed(now, ctx.cfg().auth.renewal_window());
        match ctx.tokens().create_token(&next_claims) {
            Ok(token) => {
                ctx.metrics().token_renewals.inc(&[]);
                HeaderValue::try_from(token).ok()
            }
            Err(e) => {
                tracing::warn!(subject = %claims.subject_id, error = %e, "token renewal failed");
                None
            }
        }
    } else {
        None
    };

    req.extensions_mut().insert(claims);
    let mut res = next.run(req).await;
    if let Some(token) = renewed {
        res.headers_mut().insert(ACCESS_TOKEN_HEADER, token);
    }
    res
}
