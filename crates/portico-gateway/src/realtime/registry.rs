//! Per-group connection registry.
//!
//! The map is guarded by one mutex held only for map operations. Sends always
//! happen on a snapshot taken under the lock, never while holding it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use serde::Serialize;

use portico_core::{GatewayError, Result};

use crate::realtime::connection::Connection;
use crate::realtime::types::PreparedMsg;

pub struct ConnectionRegistry {
    group: String,
    max_connections: usize,
    connections: Mutex<HashMap<String, Arc<Connection>>>,
    self_ref: Weak<ConnectionRegistry>,
}

impl ConnectionRegistry {
    pub fn new(group: impl Into<String>, max_connections: usize) -> Arc<Self> {
        let group = group.into();
        Arc::new_cyclic(|self_ref| Self {
            group,
            max_connections,
            connections: Mutex::new(HashMap::new()),
            self_ref: self_ref.clone(),
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Connection>>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit a connection. Capacity is checked under the same lock as the
    /// insert. A previous connection with the same id is replaced and closed.
    pub fn register(&self, conn: Arc<Connection>) -> Result<()> {
        let replaced = {
            let mut map = self.lock();
            if !map.contains_key(conn.id()) && map.len() >= self.max_connections {
                return Err(GatewayError::CapacityExceeded { max: self.max_connections });
            }
            if !conn.bind(&self.group, self.self_ref.clone()) {
                return Err(GatewayError::BadRequest(format!(
                    "connection {} already belongs to group {}",
                    conn.id(),
                    conn.group().unwrap_or_default()
                )));
            }
            map.insert(conn.id().to_string(), Arc::clone(&conn))
        };

        if let Some(old) = replaced {
            if !Arc::ptr_eq(&old, &conn) {
                tracing::debug!(group = %self.group, conn_id = %conn.id(), "replacing connection with same id");
                old.close();
            }
        }
        Ok(())
    }

    /// Remove this exact connection (not a newer one reusing its id) and close it.
    pub fn unregister(&self, conn: &Arc<Connection>) -> bool {
        let removed = {
            let mut map = self.lock();
            match map.get(conn.id()) {
                Some(cur) if Arc::ptr_eq(cur, conn) => map.remove(conn.id()).is_some(),
                _ => false,
            }
        };
        conn.close();
        removed
    }

    /// Remove by id and close.
    pub fn disconnect(&self, id: &str) -> bool {
        let removed = self.lock().remove(id);
        match removed {
            Some(conn) => {
                conn.close();
                true
            }
            None => false,
        }
    }

    pub fn client(&self, id: &str) -> Option<Arc<Connection>> {
        self.lock().get(id).cloned()
    }

    pub fn connected_clients(&self) -> usize {
        self.lock().len()
    }

    pub fn is_full(&self) -> bool {
        self.connected_clients() >= self.max_connections
    }

    pub fn ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.lock().values().cloned().collect()
    }

    /// Send `payload` to every connection. A connection whose send fails is
    /// disconnected; the others are unaffected. Returns the delivered count.
    pub async fn broadcast(&self, payload: Bytes) -> usize {
        self.broadcast_prepared(&PreparedMsg::from_bytes(payload)).await
    }

    pub async fn broadcast_json<T: Serialize + ?Sized>(&self, msg: &T) -> Result<usize> {
        let prepared = PreparedMsg::from_json(msg)?;
        Ok(self.broadcast_prepared(&prepared).await)
    }

    pub async fn broadcast_prepared(&self, prepared: &PreparedMsg) -> usize {
        let targets = self.snapshot();

        let mut futs = FuturesUnordered::new();
        for conn in targets {
            let msg = prepared.to_ws_message();
            futs.push(async move {
                let res = conn.send_message(msg).await;
                (conn, res)
            });
        }

        let mut delivered = 0;
        while let Some((conn, res)) = futs.next().await {
            match res {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(group = %self.group, conn_id = %conn.id(), error = %e, "broadcast send failed");
                    self.unregister(&conn);
                }
            }
        }
        delivered
    }
}
