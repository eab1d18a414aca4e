//! Endpoint descriptors.
//!
//! An endpoint is a closed set of variants. Each one contributes route
//! entries (for the auth guards) through `routes()` and handlers (for axum)
//! when the gateway router is built.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{self, MethodRouter};
use serde::de::DeserializeOwned;

use portico_core::protocol::{JsonDecoder, MessageDecoder};
use portico_core::{Result, RoleFlags, SkipFlags};

use crate::dispatch::{Dispatcher, MessageHandler};
use crate::routes::mount::{Mount, MountKind};
use crate::routes::table::RouteEntry;

/// Join a base path and a relative path into a full route path.
/// An empty result maps to `/`.
pub fn join_path(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    let joined = match (base.is_empty(), path.is_empty()) {
        (true, true) => String::new(),
        (false, true) => base.to_string(),
        (true, false) => format!("/{path}"),
        (false, false) => format!("{base}/{path}"),
    };

    if joined.is_empty() {
        "/".to_string()
    } else if joined.starts_with('/') {
        joined
    } else {
        format!("/{joined}")
    }
}

pub enum Endpoint {
    Rest(RestEndpoint),
    WebSocket(WsEndpoint),
    Static(StaticEndpoint),
}

impl Endpoint {
    /// Route entries this endpoint adds to the table.
    pub fn routes(&self) -> Result<Vec<RouteEntry>> {
        match self {
            Endpoint::Rest(ep) => ep
                .entries
                .iter()
                .map(|e| RouteEntry::new(e.method.clone(), &ep.full_path(e), e.skip, e.roles))
                .collect(),
            Endpoint::WebSocket(ep) => {
                Ok(vec![RouteEntry::new(Method::GET, &ep.path, ep.skip, ep.roles)?])
            }
            Endpoint::Static(ep) => {
                let mut out = Vec::with_capacity(4);
                for method in [Method::GET, Method::HEAD] {
                    out.push(RouteEntry::new(method.clone(), &ep.path, ep.skip, ep.roles)?);
                    if let StaticSource::Folder(_) = ep.source {
                        out.push(RouteEntry::new(method, &ep.file_pattern(), ep.skip, ep.roles)?);
                    }
                }
                Ok(out)
            }
        }
    }

    /// Paths this endpoint mounts on the axum router.
    pub fn mounts(&self) -> Vec<Mount> {
        match self {
            Endpoint::Rest(ep) => ep
                .entries
                .iter()
                .map(|e| Mount::new(ep.full_path(e), MountKind::Rest))
                .collect(),
            Endpoint::WebSocket(ep) => vec![Mount::new(ep.path.clone(), MountKind::WebSocket)],
            Endpoint::Static(ep) => match ep.source {
                StaticSource::File(_) => vec![Mount::new(ep.path.clone(), MountKind::Static)],
                StaticSource::Folder(_) if ep.path == "/" => vec![Mount::new("/", MountKind::Fallback)],
                StaticSource::Folder(_) => vec![
                    Mount::new(ep.path.clone(), MountKind::Static),
                    Mount::new(ep.file_pattern(), MountKind::Static),
                ],
            },
        }
    }
}

impl From<RestEndpoint> for Endpoint {
    fn from(ep: RestEndpoint) -> Self {
        Endpoint::Rest(ep)
    }
}

impl From<WsEndpoint> for Endpoint {
    fn from(ep: WsEndpoint) -> Self {
        Endpoint::WebSocket(ep)
    }
}

impl From<StaticEndpoint> for Endpoint {
    fn from(ep: StaticEndpoint) -> Self {
        Endpoint::Static(ep)
    }
}

/// One REST route: method, relative path, access flags, and its handler.
pub struct RestEntry {
    method: Method,
    path: String,
    skip: SkipFlags,
    roles: RoleFlags,
    handler: MethodRouter,
}

impl RestEntry {
    pub fn new(method: Method, path: impl Into<String>, handler: MethodRouter) -> Self {
        Self {
            method,
            path: path.into(),
            skip: SkipFlags::NONE,
            roles: RoleFlags::NONE,
            handler,
        }
    }

    pub fn get<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::new(Method::GET, path, routing::get(handler))
    }

    pub fn post<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::new(Method::POST, path, routing::post(handler))
    }

    pub fn put<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::new(Method::PUT, path, routing::put(handler))
    }

    pub fn patch<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::new(Method::PATCH, path, routing::patch(handler))
    }

    pub fn delete<H, T>(path: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::new(Method::DELETE, path, routing::delete(handler))
    }

    /// Guards this route bypasses (OR-composed).
    pub fn skip(mut self, flags: SkipFlags) -> Self {
        self.skip |= flags;
        self
    }

    /// Roles admitted; any intersecting role passes.
    pub fn roles(mut self, roles: RoleFlags) -> Self {
        self.roles |= roles;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// REST routes sharing a base path.
pub struct RestEndpoint {
    base_path: String,
    entries: Vec<RestEntry>,
}

impl RestEndpoint {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self { base_path: base_path.into(), entries: Vec::new() }
    }

    /// Add a route; the same method and path replaces the earlier entry in place.
    pub fn entry(mut self, entry: RestEntry) -> Self {
        match self
            .entries
            .iter_mut()
            .find(|e| e.method == entry.method && e.path == entry.path)
        {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn entries(&self) -> &[RestEntry] {
        &self.entries
    }

    fn full_path(&self, entry: &RestEntry) -> String {
        join_path(&self.base_path, &entry.path)
    }

    /// (full path, handler) pairs for the axum router.
    pub(crate) fn into_handlers(self) -> Vec<(Method, String, MethodRouter)> {
        let base = self.base_path;
        self.entries
            .into_iter()
            .map(|e| (e.method, join_path(&base, &e.path), e.handler))
            .collect()
    }
}

/// WebSocket endpoint: one path per connection group.
///
/// Session tokens are not required on the upgrade request by default.
pub struct WsEndpoint {
    group: String,
    path: String,
    skip: SkipFlags,
    roles: RoleFlags,
    json: JsonDecoder,
    decoder: Option<Arc<dyn MessageDecoder>>,
    dispatcher: Dispatcher,
}

impl WsEndpoint {
    pub fn new(group: impl Into<String>, path: &str) -> Self {
        Self {
            group: group.into(),
            path: join_path("", path),
            skip: SkipFlags::TOKEN,
            roles: RoleFlags::NONE,
            json: JsonDecoder::new(),
            decoder: None,
            dispatcher: Dispatcher::new(),
        }
    }

    /// Handle `op_code`, decoding its frames into `T` with the JSON codec.
    pub fn on<T>(mut self, op_code: i32, handler: Arc<dyn MessageHandler>) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.json = self.json.register::<T>(op_code);
        self.dispatcher.register(op_code, handler);
        self
    }

    /// Handle `op_code` without a typed body; the handler sees the raw frame.
    pub fn on_raw(self, op_code: i32, handler: Arc<dyn MessageHandler>) -> Self {
        self.dispatcher.register(op_code, handler);
        self
    }

    /// Replace the JSON codec. Typed registrations made through `on` are then
    /// the custom decoder's concern.
    pub fn with_decoder(mut self, decoder: Arc<dyn MessageDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Replace the default skip flags (`TOKEN`).
    pub fn skip(mut self, flags: SkipFlags) -> Self {
        self.skip = flags;
        self
    }

    pub fn roles(mut self, roles: RoleFlags) -> Self {
        self.roles |= roles;
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn into_parts(self) -> (String, String, Arc<dyn MessageDecoder>, Arc<Dispatcher>) {
        let decoder = match self.decoder {
            Some(d) => d,
            None => Arc::new(self.json),
        };
        (self.group, self.path, decoder, Arc::new(self.dispatcher))
    }
}

/// What a static endpoint serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticSource {
    /// Every file under the folder, at `path` and below.
    Folder(PathBuf),
    /// One file, at exactly `path`.
    File(PathBuf),
}

/// Serves files from the local filesystem.
pub struct StaticEndpoint {
    path: String,
    source: StaticSource,
    skip: SkipFlags,
    roles: RoleFlags,
}

impl StaticEndpoint {
    /// Serve `folder` at `path` and below.
    /// Public by default (`SkipFlags::ALL`); browsers fetch these without headers.
    pub fn new(path: &str, folder: impl AsRef<Path>) -> Self {
        Self::with_source(path, StaticSource::Folder(folder.as_ref().to_path_buf()))
    }

    /// Serve a single file at exactly `path`.
    pub fn file(path: &str, file: impl AsRef<Path>) -> Self {
        Self::with_source(path, StaticSource::File(file.as_ref().to_path_buf()))
    }

    fn with_source(path: &str, source: StaticSource) -> Self {
        Self {
            path: join_path("", path),
            source,
            skip: SkipFlags::ALL,
            roles: RoleFlags::NONE,
        }
    }

    pub fn skip(mut self, flags: SkipFlags) -> Self {
        self.skip = flags;
        self
    }

    pub fn roles(mut self, roles: RoleFlags) -> Self {
        self.roles |= roles;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> &StaticSource {
        &self.source
    }

    fn file_pattern(&self) -> String {
        join_path(&self.path, "*file")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn ok() -> &'static str {
        "ok"
    }

    #[test]
    fn joins_paths() {
        assert_eq!(join_path("", ""), "/");
        assert_eq!(join_path("/v1/", "/x"), "/v1/x");
        assert_eq!(join_path("/v1", ""), "/v1");
        assert_eq!(join_path("v1", "x/:id"), "/v1/x/:id");
    }

    #[test]
    fn rest_routes_carry_flags() {
        let ep: Endpoint = RestEndpoint::new("/v1")
            .entry(RestEntry::get("/x", ok).skip(SkipFlags::TOKEN))
            .entry(RestEntry::delete("/x/:id", ok).roles(RoleFlags::from_bits(16)))
            .into();

        let routes = ep.routes().unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].key(), "GET /v1/x");
        assert_eq!(routes[0].skip(), SkipFlags::TOKEN);
        assert_eq!(routes[1].key(), "DELETE /v1/x/:id");
        assert_eq!(routes[1].roles().bits(), 16);
    }

    #[test]
    fn duplicate_rest_entry_replaces_in_place() {
        let ep = RestEndpoint::new("/v1")
            .entry(RestEntry::get("/a", ok))
            .entry(RestEntry::get("/b", ok))
            .entry(RestEntry::get("/a", ok).skip(SkipFlags::ALL));
        assert_eq!(ep.entries().len(), 2);
        assert_eq!(ep.entries()[0].path(), "/a");
    }

    #[test]
    fn websocket_defaults_to_token_skip() {
        let ep: Endpoint = WsEndpoint::new("airplanes", "/ws/airplanes").into();
        let routes = ep.routes().unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].key(), "GET /ws/airplanes");
        assert_eq!(routes[0].skip(), SkipFlags::TOKEN);
    }

    #[test]
    fn static_registers_root_and_wildcard() {
        let ep: Endpoint = StaticEndpoint::new("/doc", "./doc").into();
        let keys: Vec<String> = ep.routes().unwrap().iter().map(RouteEntry::key).collect();
        assert!(keys.contains(&"GET /doc".to_string()));
        assert!(keys.contains(&"GET /doc/*file".to_string()));
        assert!(keys.contains(&"HEAD /doc/*file".to_string()));
    }

    #[test]
    fn static_file_registers_exact_path_only() {
        let ep: Endpoint = StaticEndpoint::file("/favicon.svg", "./assets/favicon.svg").into();
        let keys: Vec<String> = ep.routes().unwrap().iter().map(RouteEntry::key).collect();
        assert_eq!(keys, vec!["GET /favicon.svg", "HEAD /favicon.svg"]);
        assert_eq!(ep.mounts(), vec![Mount::new("/favicon.svg", MountKind::Static)]);
    }

    #[test]
    fn static_folder_at_root_is_the_fallback() {
        let ep: Endpoint = StaticEndpoint::new("/", "./public").into();
        assert_eq!(ep.mounts(), vec![Mount::new("/", MountKind::Fallback)]);
    }
}
