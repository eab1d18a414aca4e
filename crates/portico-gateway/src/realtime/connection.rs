//! One admitted WebSocket connection.
//!
//! The session task owns the socket; everything else (handlers, the group
//! registry, broadcasts) talks to it through this handle. Outbound frames go
//! through a bounded queue drained by the session writer.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use axum::extract::ws::Message;
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

use portico_core::{GatewayError, Result};

use crate::realtime::registry::ConnectionRegistry;
use crate::realtime::types::PreparedMsg;

/// Request extension consulted at upgrade time.
///
/// Upstream middleware may insert it to choose the connection id and to attach
/// extra parameters; query parameters are merged over `params`.
#[derive(Debug, Clone, Default)]
pub struct ConnectionHint {
    pub client_id: Option<String>,
    pub params: HashMap<String, String>,
}

struct Membership {
    group: String,
    registry: Weak<ConnectionRegistry>,
}

pub struct Connection {
    id: String,
    remote_addr: Option<SocketAddr>,
    params: HashMap<String, String>,
    tx: mpsc::Sender<Message>,
    write_timeout: Duration,
    membership: OnceLock<Membership>,
    closed: AtomicBool,
    shutdown: Notify,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .field("group", &self.group())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        remote_addr: Option<SocketAddr>,
        params: HashMap<String, String>,
        tx: mpsc::Sender<Message>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            remote_addr,
            params,
            tx,
            write_timeout,
            membership: OnceLock::new(),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Group of the registry holding this connection, once registered.
    pub fn group(&self) -> Option<&str> {
        self.membership.get().map(|m| m.group.as_str())
    }

    /// Registry of this connection's group, for handlers that fan out.
    pub fn registry(&self) -> Option<Arc<ConnectionRegistry>> {
        self.membership.get().and_then(|m| m.registry.upgrade())
    }

    /// Bind to `group`. A connection belongs to at most one group.
    pub(crate) fn bind(&self, group: &str, registry: Weak<ConnectionRegistry>) -> bool {
        if self.membership.get().is_none() {
            let _ = self.membership.set(Membership { group: group.to_string(), registry });
        }
        self.group() == Some(group)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Ask the session task to stop. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.shutdown.notify_one();
        }
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        self.shutdown.notified().await;
    }

    /// Queue one frame, waiting at most the write deadline.
    /// Any failure closes the connection.
    pub async fn send_message(&self, msg: Message) -> Result<()> {
        if self.is_closed() {
            return Err(GatewayError::Transport(format!("connection {} is closed", self.id)));
        }
        match timeout(self.write_timeout, self.tx.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => {
                self.close();
                Err(GatewayError::Transport(format!("connection {}: outbound channel closed", self.id)))
            }
            Err(_) => {
                self.close();
                Err(GatewayError::Transport(format!("connection {}: write timeout", self.id)))
            }
        }
    }

    pub async fn send_prepared(&self, msg: &PreparedMsg) -> Result<()> {
        self.send_message(msg.to_ws_message()).await
    }

    /// Send arbitrary bytes as-is.
    pub async fn send_raw(&self, payload: Bytes) -> Result<()> {
        self.send_prepared(&PreparedMsg::from_bytes(payload)).await
    }

    /// Send a typed message serialized as JSON.
    pub async fn send<T: Serialize + ?Sized>(&self, msg: &T) -> Result<()> {
        let prepared = PreparedMsg::from_json(msg)?;
        self.send_prepared(&prepared).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn conn(queue: usize) -> (Connection, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(queue);
        let c = Connection::new("c1", None, HashMap::new(), tx, Duration::from_millis(50));
        (c, rx)
    }

    #[tokio::test]
    async fn close_is_idempotent_and_wakes_waiter() {
        let (c, _rx) = conn(1);
        c.close();
        c.close();
        assert!(c.is_closed());
        // permit stored by the first close
        tokio::time::timeout(Duration::from_millis(100), c.closed()).await.unwrap();
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_closes() {
        let (c, rx) = conn(1);
        drop(rx);
        assert!(c.send_raw(Bytes::from_static(b"x")).await.is_err());
        assert!(c.is_closed());
    }

    #[tokio::test]
    async fn full_queue_hits_write_deadline() {
        let (c, _rx) = conn(1);
        c.send_raw(Bytes::from_static(b"a")).await.unwrap();
        let err = c.send_raw(Bytes::from_static(b"b")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        assert!(c.is_closed());
    }

    #[test]
    fn group_binds_once() {
        let (c, _rx) = conn(1);
        assert!(c.bind("a", Weak::new()));
        assert!(c.bind("a", Weak::new()));
        assert!(!c.bind("b", Weak::new()));
        assert_eq!(c.group(), Some("a"));
    }
}
