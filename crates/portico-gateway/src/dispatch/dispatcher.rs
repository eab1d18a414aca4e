use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;

use portico_core::protocol::Envelope;
use portico_core::Result;

use crate::obs::metrics::GatewayMetrics;
use crate::realtime::Connection;

/// Handler for one WebSocket opcode.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, env: Envelope, conn: Arc<Connection>) -> Result<()>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(Envelope, Arc<Connection>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn handle(&self, env: Envelope, conn: Arc<Connection>) -> Result<()> {
        (self.0)(env, conn).await
    }
}

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(Envelope, Arc<Connection>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Opcode -> handler table of one WebSocket endpoint.
#[derive(Default)]
pub struct Dispatcher {
    handlers: DashMap<i32, Arc<dyn MessageHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self { handlers: DashMap::new() }
    }

    /// Register (or replace) the handler for `op_code`.
    pub fn register(&self, op_code: i32, handler: Arc<dyn MessageHandler>) {
        self.handlers.insert(op_code, handler);
    }

    pub fn has(&self, op_code: i32) -> bool {
        self.handlers.contains_key(&op_code)
    }

    pub fn registered_op_codes(&self) -> Vec<i32> {
        let mut ops: Vec<i32> = self.handlers.iter().map(|e| *e.key()).collect();
        ops.sort_unstable();
        ops
    }

    /// Run the handler for `env` on its own task. Returns false when no
    /// handler is registered for the opcode.
    pub fn dispatch(&self, env: Envelope, conn: Arc<Connection>, metrics: &Arc<GatewayMetrics>) -> bool {
        let op_code = env.op_code();
        let Some(handler) = self.handlers.get(&op_code).map(|h| Arc::clone(h.value())) else {
            return false;
        };

        let metrics = Arc::clone(metrics);
        tokio::spawn(async move {
            let start = Instant::now();
            let res = handler.handle(env, Arc::clone(&conn)).await;

            let group = conn.group().unwrap_or_default();
            let op = op_code.to_string();
            metrics.dispatch_duration.observe(&[("group", group), ("op_code", op.as_str())], start.elapsed());

            if let Err(e) = res {
                metrics.handler_errors.inc(&[("group", group), ("code", e.client_code().as_str())]);
                tracing::warn!(group = %group, conn_id = %conn.id(), op_code, error = %e, "message handler failed");
            }
        });
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use portico_core::protocol::{Body, MessageHeader};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn dispatches_to_registered_opcode_only() {
        let d = Dispatcher::new();
        let (seen_tx, mut seen_rx) = mpsc::channel::<i32>(1);
        d.register(
            7,
            handler_fn(move |env: Envelope, _conn| {
                let seen_tx = seen_tx.clone();
                async move {
                    let _ = seen_tx.send(env.op_code()).await;
                    Ok(())
                }
            }),
        );

        let (tx, _rx) = mpsc::channel(1);
        let conn = Arc::new(Connection::new("c", None, HashMap::new(), tx, Duration::from_secs(1)));
        let metrics = Arc::new(GatewayMetrics::default());

        let env = |op| Envelope::new(MessageHeader::new(op), Body::Raw(Default::default()));
        assert!(!d.dispatch(env(8), Arc::clone(&conn), &metrics));
        assert!(d.dispatch(env(7), conn, &metrics));

        let got = tokio::time::timeout(Duration::from_secs(1), seen_rx.recv()).await.unwrap();
        assert_eq!(got, Some(7));
        assert_eq!(d.registered_op_codes(), vec![7]);
    }
}
