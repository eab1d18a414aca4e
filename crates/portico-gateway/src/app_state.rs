//! Gateway context and builder.
//!
//! `GatewayContext` is the explicit, cheaply clonable handle shared by the
//! middleware, the WebSocket listeners, and the operational endpoints. It is
//! built once from the config and the endpoint list; nothing about it is
//! global.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tokio::net::TcpListener;

use portico_core::auth::TokenService;
use portico_core::{GatewayError, Result, RoleFlags, SkipFlags};

use crate::config::GatewayConfig;
use crate::obs::GatewayMetrics;
use crate::ops;
use crate::realtime::ConnectionRegistry;
use crate::router;
use crate::routes::{mount, Endpoint, RouteEntry, RouteTable};

#[derive(Clone)]
pub struct GatewayContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    cfg: GatewayConfig,
    tokens: TokenService,
    routes: Arc<RouteTable>,
    registries: HashMap<String, Arc<ConnectionRegistry>>,
    metrics: Arc<GatewayMetrics>,
    custom_headers: Vec<(HeaderName, HeaderValue)>,
    api_version: HeaderValue,
}

impl GatewayContext {
    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.inner.routes
    }

    /// Registry of a WebSocket group.
    pub fn registry(&self, group: &str) -> Option<Arc<ConnectionRegistry>> {
        self.inner.registries.get(group).cloned()
    }

    pub fn groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self.inner.registries.keys().map(String::as_str).collect();
        groups.sort_unstable();
        groups
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn custom_headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.inner.custom_headers
    }

    pub fn api_version(&self) -> &HeaderValue {
        &self.inner.api_version
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Stop reporting ready and close every WebSocket connection.
    pub fn drain(&self) {
        self.inner.metrics.set_draining();
        for registry in self.inner.registries.values() {
            for id in registry.ids() {
                registry.disconnect(&id);
            }
        }
    }

    /// Per-group connection counts for the metrics endpoint.
    pub fn metrics_extra(&self) -> Vec<(String, u64)> {
        self.groups()
            .into_iter()
            .filter_map(|g| {
                let r = self.inner.registries.get(g)?;
                let count = u64::try_from(r.connected_clients()).unwrap_or(u64::MAX);
                Some((format!("portico_ws_connections{{group=\"{g}\"}}"), count))
            })
            .collect()
    }
}

/// Collects endpoints, then builds the context and the axum router.
pub struct GatewayBuilder {
    cfg: GatewayConfig,
    endpoints: Vec<Endpoint>,
}

impl GatewayBuilder {
    pub fn new(cfg: GatewayConfig) -> Self {
        Self { cfg, endpoints: Vec::new() }
    }

    pub fn add_endpoint(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    pub fn add_endpoints(mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    pub fn build(self) -> Result<Gateway> {
        let Self { cfg, endpoints } = self;
        cfg.validate()?;

        let tokens = TokenService::new(&cfg.auth.api_secret, &cfg.auth.signing_key)?;

        let mut table = RouteTable::new();
        for ep in &endpoints {
            for entry in ep.routes()? {
                let key = entry.key();
                if table.register(entry) {
                    tracing::warn!(%key, "duplicate route key; later registration wins");
                }
            }
        }
        let mounts: Vec<_> = endpoints.iter().flat_map(Endpoint::mounts).collect();
        mount::check(&mounts)?;

        let ops_paths = ops::mounted_paths(cfg.gateway.enable_metrics, &mounts);
        for &path in &ops_paths {
            table.register(RouteEntry::new(axum::http::Method::GET, path, SkipFlags::ALL, RoleFlags::NONE)?);
        }

        let mut registries = HashMap::new();
        for ep in &endpoints {
            if let Endpoint::WebSocket(ws) = ep {
                registries
                    .entry(ws.group().to_string())
                    .or_insert_with(|| ConnectionRegistry::new(ws.group(), cfg.websocket.max_connections));
            }
        }

        let custom_headers = cfg
            .gateway
            .headers
            .iter()
            .map(|(k, v)| {
                let name = HeaderName::try_from(k.as_str())
                    .map_err(|e| GatewayError::Config(format!("header name {k}: {e}")))?;
                let value = HeaderValue::try_from(v.as_str())
                    .map_err(|e| GatewayError::Config(format!("header value for {k}: {e}")))?;
                Ok((name, value))
            })
            .collect::<Result<Vec<_>>>()?;
        let api_version = HeaderValue::try_from(cfg.gateway.api_version.as_str())
            .map_err(|e| GatewayError::Config(format!("gateway.api_version: {e}")))?;

        tracing::info!(
            routes = table.len(),
            groups = registries.len(),
            "gateway context built"
        );

        let ctx = GatewayContext {
            inner: Arc::new(ContextInner {
                cfg,
                tokens,
                routes: Arc::new(table),
                registries,
                metrics: Arc::new(GatewayMetrics::default()),
                custom_headers,
                api_version,
            }),
        };
        let router = router::build_router(&ctx, endpoints, &ops_paths);

        Ok(Gateway { ctx, router })
    }
}

/// Built gateway: its context and the fully layered router.
pub struct Gateway {
    ctx: GatewayContext,
    router: Router,
}

impl Gateway {
    pub fn context(&self) -> &GatewayContext {
        &self.ctx
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_parts(self) -> (GatewayContext, Router) {
        (self.ctx, self.router)
    }

    /// Serve until `signal` resolves, then drain and stop.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ctx = self.ctx.clone();
        let service = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                signal.await;
                tracing::info!("draining connections");
                ctx.drain();
            })
            .await
            .map_err(|e| GatewayError::Transport(format!("server failed: {e}")))
    }

    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }
}
