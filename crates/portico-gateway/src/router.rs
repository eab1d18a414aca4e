//! Axum router wiring.
//!
//! REST handlers, WebSocket upgrade routes, static file services, and the
//! operational endpoints, wrapped in the middleware chain.

use axum::http::Method;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::MethodRouter;
use axum::{Extension, Router};
use tower_http::services::{ServeDir, ServeFile};

use crate::app_state::GatewayContext;
use crate::middleware;
use crate::ops;
use crate::routes::{Endpoint, StaticSource};
use crate::transport::ws::{self, WsListener, WsSettings};

/// Mounts are assumed conflict-free (`routes::mount::check`); axum panics
/// otherwise.
pub fn build_router(ctx: &GatewayContext, endpoints: Vec<Endpoint>, ops_paths: &[&'static str]) -> Router {
    let settings = WsSettings::from_config(&ctx.cfg().websocket);
    let metrics = ctx.metrics();

    // later registrations of the same key replace earlier ones in place
    let mut rest: Vec<(Method, String, MethodRouter)> = Vec::new();
    let mut app = Router::new();

    for ep in endpoints {
        match ep {
            Endpoint::Rest(r) => {
                for (method, path, handler) in r.into_handlers() {
                    // the route table keys are case-insensitive; keep one handler per key
                    match rest.iter_mut().find(|(m, p, _)| *m == method && p.eq_ignore_ascii_case(&path)) {
                        Some(slot) => {
                            slot.1 = path;
                            slot.2 = handler;
                        }
                        None => rest.push((method, path, handler)),
                    }
                }
            }
            Endpoint::WebSocket(w) => {
                let (group, path, decoder, dispatcher) = w.into_parts();
                let Some(registry) = ctx.registry(&group) else {
                    tracing::error!(%group, "no registry for websocket group; endpoint skipped");
                    continue;
                };
                tracing::info!(%group, %path, op_codes = ?dispatcher.registered_op_codes(), "websocket endpoint");
                let listener = WsListener::new(registry, dispatcher, decoder, settings.clone(), metrics.clone());
                app = app.merge(ws::router(&path, listener));
            }
            Endpoint::Static(s) => {
                app = match s.source() {
                    StaticSource::File(file) => {
                        tracing::info!(path = %s.path(), file = %file.display(), "static file");
                        app.route_service(s.path(), ServeFile::new(file))
                    }
                    StaticSource::Folder(folder) => {
                        tracing::info!(path = %s.path(), folder = %folder.display(), "static folder");
                        let files = ServeDir::new(folder);
                        if s.path() == "/" {
                            app.fallback_service(files)
                        } else {
                            app.nest_service(s.path(), files)
                        }
                    }
                };
            }
        }
    }

    // one MethodRouter per path
    let mut by_path: Vec<(String, MethodRouter)> = Vec::new();
    for (_, path, handler) in rest {
        match by_path.iter().position(|(p, _)| *p == path) {
            Some(i) => {
                let (p, prev) = by_path.swap_remove(i);
                by_path.push((p, prev.merge(handler)));
            }
            None => by_path.push((path, handler)),
        }
    }
    for (path, handler) in by_path {
        app = app.route(&path, handler);
    }

    app.merge(ops::router(ctx, ops_paths))
        .layer(from_fn_with_state(ctx.clone(), middleware::token_guard))
        .layer(from_fn_with_state(ctx.clone(), middleware::api_key_guard))
        .layer(from_fn(middleware::no_cache))
        .layer(from_fn_with_state(ctx.clone(), middleware::api_version))
        .layer(from_fn_with_state(ctx.clone(), middleware::cors))
        .layer(Extension(ctx.clone()))
}
