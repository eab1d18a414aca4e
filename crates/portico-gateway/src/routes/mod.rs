//! Route registration and access-flag lookup.
//!
//! - `table`: ordered route entries keyed by `"METHOD fullPath"` and the
//!   static-then-dynamic matcher the auth guards consult.
//! - `endpoint`: endpoint descriptors (REST, WebSocket, static files) that
//!   contribute entries to the table and handlers to the axum router.
//! - `mount`: conflict check over the paths handed to axum.

pub mod endpoint;
pub mod mount;
pub mod table;

pub use endpoint::{
    join_path, Endpoint, RestEndpoint, RestEntry, StaticEndpoint, StaticSource, WsEndpoint,
};
pub use mount::{Mount, MountKind};
pub use table::{AccessFlags, RouteEntry, RouteTable};
