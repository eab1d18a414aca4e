//! Realtime runtime for WebSocket groups.
//!
//! - `connection`: one admitted socket's outbound handle and metadata.
//! - `registry`: per-group connection map with admission and broadcast.
//! - `types`: outbound message prepared once and fanned out.

pub mod connection;
pub mod registry;
pub mod types;

pub use connection::{Connection, ConnectionHint};
pub use registry::ConnectionRegistry;
pub use types::PreparedMsg;
