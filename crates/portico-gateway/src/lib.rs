//! Portico gateway library entry.
//!
//! This crate wires the route table, auth middleware, WebSocket transport,
//! realtime registries, and dispatcher into an axum application. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod middleware;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod routes;
pub mod services;
pub mod transport;

pub use app_state::{Gateway, GatewayBuilder, GatewayContext};
