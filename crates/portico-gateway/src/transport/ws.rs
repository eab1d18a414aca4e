//! WebSocket upgrade handler and session loop.
//!
//! Responsibilities:
//! - Admission against the group registry (429 when full)
//! - Connection id from `ConnectionHint` or a fresh UUID v4; query params kept,
//!   request headers too when `inject_headers` is set
//! - Lifecycle: server pings, idle timeout, write deadline
//! - Decode each frame once and dispatch it by opcode on its own task
//!
//! The session task owns the socket. It unregisters and closes the connection
//! exactly once, whatever ended the loop.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Router};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tracing::Instrument;

use portico_core::protocol::MessageDecoder;
use portico_core::GatewayError;

use crate::config::WebSocketSection;
use crate::dispatch::Dispatcher;
use crate::middleware::reject;
use crate::obs::GatewayMetrics;
use crate::realtime::{Connection, ConnectionHint, ConnectionRegistry};
use crate::transport::codec::{classify, Inbound};

/// Close code sent when admission fails after the upgrade (1013 "try again later").
const CLOSE_TRY_AGAIN_LATER: u16 = 1013;

/// Per-session timing and sizing.
#[derive(Debug, Clone)]
pub struct WsSettings {
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
    pub outbound_queue: usize,
    pub write_timeout: Duration,
    pub max_message_bytes: usize,
    pub inject_headers: bool,
}

impl WsSettings {
    pub fn from_config(ws: &WebSocketSection) -> Self {
        Self {
            ping_interval: Duration::from_millis(ws.ping_interval_ms),
            idle_timeout: Duration::from_millis(ws.idle_timeout_ms),
            outbound_queue: ws.outbound_queue,
            write_timeout: Duration::from_millis(ws.write_timeout_ms),
            max_message_bytes: ws.max_message_bytes,
            inject_headers: ws.inject_headers,
        }
    }
}

/// State of one WebSocket endpoint.
#[derive(Clone)]
pub struct WsListener {
    inner: Arc<ListenerInner>,
}

struct ListenerInner {
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<Dispatcher>,
    decoder: Arc<dyn MessageDecoder>,
    settings: WsSettings,
    metrics: Arc<GatewayMetrics>,
}

impl WsListener {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        dispatcher: Arc<Dispatcher>,
        decoder: Arc<dyn MessageDecoder>,
        settings: WsSettings,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(ListenerInner { registry, dispatcher, decoder, settings, metrics }),
        }
    }

    pub fn group(&self) -> &str {
        self.inner.registry.group()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.inner.registry
    }

    /// Decode one frame and hand it to its handler.
    /// Returns a direct reply for keep-alives nobody handles.
    fn on_frame(&self, conn: &Arc<Connection>, frame: &[u8]) -> Option<Message> {
        let inner = &self.inner;
        let group = self.group();

        let env = match inner.decoder.decode(frame) {
            Ok(env) => env,
            Err(e) => {
                inner.metrics.decode_errors.inc(&[("group", group)]);
                tracing::warn!(len = frame.len(), error = %e, "dropping undecodable frame");
                return None;
            }
        };

        let op_code = env.op_code();
        if env.is_ping() && !inner.dispatcher.has(op_code) {
            return match inner.decoder.encode(&env.header, serde_json::Value::Null) {
                Ok(bytes) => Some(crate::realtime::PreparedMsg::from_bytes(bytes).to_ws_message()),
                Err(e) => {
                    tracing::debug!(error = %e, "keep-alive reply encode failed");
                    None
                }
            };
        }

        if !inner.dispatcher.dispatch(env, Arc::clone(conn), &inner.metrics) {
            // opcode comes from the client; keep it out of the label set
            inner.metrics.unknown_op_codes.inc(&[("group", group)]);
            tracing::debug!(op_code, "no handler for opcode; frame dropped");
        }
        None
    }
}

/// Router serving the upgrade for one endpoint path.
pub fn router(path: &str, listener: WsListener) -> Router {
    Router::new().route(path, get(ws_upgrade)).with_state(listener)
}

pub async fn ws_upgrade(
    State(listener): State<WsListener>,
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    hint: Option<Extension<ConnectionHint>>,
    headers: HeaderMap,
) -> Response {
    let inner = &listener.inner;
    let group = listener.group().to_string();

    if inner.registry.is_full() {
        let err = GatewayError::CapacityExceeded { max: inner.registry.max_connections() };
        inner.metrics.ws_rejections.inc(&[("group", group.as_str()), ("reason", "capacity")]);
        tracing::warn!(group = %group, error = %err, "websocket upgrade rejected");
        return reject(&err);
    }

    let (client_id, mut params) = match hint {
        Some(Extension(h)) => (h.client_id, h.params),
        None => (None, HashMap::new()),
    };
    params.extend(query);
    if inner.settings.inject_headers {
        inject_headers(&mut params, &headers);
    }
    let id = client_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let remote = connect.map(|ConnectInfo(addr)| addr);

    inner.metrics.ws_upgrades.inc(&[("group", group.as_str())]);

    let max = inner.settings.max_message_bytes;
    ws.max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| {
            let span = tracing::info_span!("ws_session", group = %group, conn_id = %id);
            run_session(listener, socket, id, remote, params).instrument(span)
        })
}

fn inject_headers(params: &mut HashMap<String, String>, headers: &HeaderMap) {
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if !values.is_empty() {
            params.insert(name.as_str().to_string(), values.join(", "));
        }
    }
}

async fn run_session(
    listener: WsListener,
    socket: WebSocket,
    id: String,
    remote: Option<SocketAddr>,
    params: HashMap<String, String>,
) {
    let inner = &listener.inner;
    let settings = &inner.settings;
    let group = listener.group();

    let (out_tx, mut out_rx) = mpsc::channel::<Message>(settings.outbound_queue);
    let conn = Arc::new(Connection::new(id, remote, params, out_tx, settings.write_timeout));

    let (mut ws_tx, mut ws_rx) = socket.split();

    // capacity re-checked atomically; the pre-upgrade check can race
    if let Err(e) = inner.registry.register(Arc::clone(&conn)) {
        inner.metrics.ws_rejections.inc(&[("group", group), ("reason", "register")]);
        tracing::warn!(error = %e, "connection refused after upgrade");
        let close = CloseFrame {
            code: CLOSE_TRY_AGAIN_LATER,
            reason: e.client_code().as_str().into(),
        };
        let _ = timeout(settings.write_timeout, ws_tx.send(Message::Close(Some(close)))).await;
        return;
    }

    inner.metrics.ws_sessions_active.inc(&[("group", group)]);
    tracing::info!(remote = ?remote, "websocket connected");

    let mut ping_tick = tokio::time::interval_at(
        Instant::now() + settings.ping_interval,
        settings.ping_interval,
    );
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    let reason = loop {
        tokio::select! {
            _ = conn.closed() => break "closed",

            // outbound writer
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break "outbound closed" };
                match timeout(settings.write_timeout, ws_tx.send(m)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => break "write failed",
                    Err(_) => break "write timeout",
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else { break "stream ended" };
                let Ok(msg) = incoming else { break "read failed" };
                last_activity = Instant::now();

                match classify(&msg) {
                    Inbound::Frame(frame) => {
                        if let Some(reply) = listener.on_frame(&conn, frame) {
                            if timeout(settings.write_timeout, ws_tx.send(reply)).await.map_or(true, |r| r.is_err()) {
                                break "write failed";
                            }
                        }
                    }
                    // pong replies are queued by the protocol layer
                    Inbound::Ping | Inbound::Pong => {}
                    Inbound::Close => break "close frame",
                }
            }

            _ = ping_tick.tick() => {
                if timeout(settings.write_timeout, ws_tx.send(Message::Ping(Vec::new()))).await.map_or(true, |r| r.is_err()) {
                    break "ping failed";
                }
            }

            _ = tokio::time::sleep_until(last_activity + settings.idle_timeout) => break "idle timeout",
        }
    };

    inner.registry.unregister(&conn);
    let write_failed = matches!(reason, "write failed" | "write timeout" | "ping failed");
    if write_failed {
        inner.metrics.send_failures.inc(&[("group", group), ("reason", reason)]);
    } else {
        // the close handshake writes too; a stalled peer must not pin the task
        let _ = timeout(settings.write_timeout, ws_tx.close()).await;
    }
    drop(ws_tx);
    drop(ws_rx);
    inner.metrics.ws_sessions_active.dec(&[("group", group)]);
    tracing::info!(reason, "websocket disconnected");
}
