//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 when draining)
//! - `/metrics` : Prometheus text format
//!
//! All three are public routes (skip every guard).

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::app_state::GatewayContext;
use crate::routes::mount::{overlaps, Mount, MountKind};

pub const HEALTHZ: &str = "/healthz";
pub const READYZ: &str = "/readyz";
pub const METRICS: &str = "/metrics";

/// Operational paths served for this config.
pub fn paths(enable_metrics: bool) -> Vec<&'static str> {
    let mut out = vec![HEALTHZ, READYZ];
    if enable_metrics {
        out.push(METRICS);
    }
    out
}

/// Operational paths that no mounted route overlaps. A shadowed path is
/// left to the application and gets no route entry of its own.
pub fn mounted_paths(enable_metrics: bool, mounts: &[Mount]) -> Vec<&'static str> {
    paths(enable_metrics)
        .into_iter()
        .filter(|path| {
            let shadowed = mounts
                .iter()
                .any(|m| m.kind != MountKind::Fallback && overlaps(path, &m.path));
            if shadowed {
                tracing::warn!(path, "operational endpoint shadowed by a registered route");
            }
            !shadowed
        })
        .collect()
}

/// Router serving `paths` (from `mounted_paths`).
pub fn router(ctx: &GatewayContext, paths: &[&'static str]) -> Router {
    let mut r = Router::new();
    for &path in paths {
        r = match path {
            HEALTHZ => r.route(path, get(healthz)),
            READYZ => r.route(path, get(readyz)),
            _ => r.route(path, get(metrics)),
        };
    }
    r.with_state(ctx.clone())
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(ctx): State<GatewayContext>) -> impl IntoResponse {
    if ctx.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(ctx): State<GatewayContext>) -> Response {
    let extra = ctx.metrics_extra();
    let body = ctx.metrics().render(&extra);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
