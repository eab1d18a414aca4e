//! Built-in demo services.
//!
//! Small handlers that exercise the gateway end to end: a WebSocket echo and
//! group chat, and a REST endpoint that reports the caller's verified claims.
//! Session tokens are minted by the application, never by these endpoints.

pub mod chat;
pub mod echo;
pub mod session;

use std::sync::Arc;

use crate::routes::{Endpoint, RestEndpoint, RestEntry, WsEndpoint};

pub use chat::{ChatMessage, ChatService, CHAT_OP_CODE};
pub use echo::{EchoService, ECHO_OP_CODE};
pub use session::whoami;

/// Endpoints mounted by the gateway binary.
pub fn demo_endpoints() -> Vec<Endpoint> {
    vec![
        RestEndpoint::new("/v1")
            .entry(RestEntry::get("/whoami", whoami))
            .into(),
        WsEndpoint::new("demo", "/ws/demo")
            .on_raw(ECHO_OP_CODE, Arc::new(EchoService))
            .on::<ChatMessage>(CHAT_OP_CODE, Arc::new(ChatService))
            .into(),
    ]
}
