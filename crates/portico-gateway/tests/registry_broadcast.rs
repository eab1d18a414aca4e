#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use bytes::Bytes;
use tokio::sync::mpsc;

use portico_core::GatewayError;
use portico_gateway::realtime::{Connection, ConnectionRegistry};

fn conn(id: &str) -> (Arc<Connection>, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::channel(8);
    let c = Connection::new(id, None, HashMap::new(), tx, Duration::from_millis(100));
    (Arc::new(c), rx)
}

#[tokio::test]
async fn broadcast_delivers_exact_bytes_to_all() {
    let registry = ConnectionRegistry::new("g", 100);
    let mut rxs = Vec::new();
    for i in 0..5 {
        let (c, rx) = conn(&format!("c{i}"));
        registry.register(c).unwrap();
        rxs.push(rx);
    }

    let payload = Bytes::from_static(br#"{"OpCode":3,"Status":"ok"}"#);
    assert_eq!(registry.broadcast(payload.clone()).await, 5);

    for rx in &mut rxs {
        match rx.recv().await.unwrap() {
            Message::Text(s) => assert_eq!(s.as_bytes(), payload.as_ref()),
            other => panic!("unexpected frame {other:?}"),
        }
    }
}

#[tokio::test]
async fn failing_connection_is_disconnected_alone() {
    let registry = ConnectionRegistry::new("g", 100);
    let (good, mut good_rx) = conn("good");
    let (bad, bad_rx) = conn("bad");
    registry.register(Arc::clone(&good)).unwrap();
    registry.register(Arc::clone(&bad)).unwrap();
    drop(bad_rx);

    let delivered = registry.broadcast(Bytes::from_static(&[0x01, 0xff])).await;
    assert_eq!(delivered, 1);
    assert!(matches!(good_rx.recv().await.unwrap(), Message::Binary(b) if b == [0x01, 0xff]));

    assert!(registry.client("bad").is_none());
    assert!(bad.is_closed());
    assert!(!good.is_closed());
    assert_eq!(registry.connected_clients(), 1);
}

#[tokio::test]
async fn admission_is_capped() {
    let registry = ConnectionRegistry::new("g", 3);
    let mut keep = Vec::new();
    for i in 0..3 {
        let (c, rx) = conn(&format!("c{i}"));
        registry.register(c).unwrap();
        keep.push(rx);
    }
    assert!(registry.is_full());

    let (extra, _rx) = conn("c3");
    let err = registry.register(extra).unwrap_err();
    assert!(matches!(err, GatewayError::CapacityExceeded { max: 3 }));
    assert_eq!(err.client_code().http_status(), 429);
    assert_eq!(registry.connected_clients(), 3);
}

#[tokio::test]
async fn concurrent_admission_never_exceeds_capacity() {
    let registry = ConnectionRegistry::new("g", 10);
    let mut tasks = Vec::new();
    for i in 0..50 {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            let (c, rx) = conn(&format!("c{i}"));
            (registry.register(c).is_ok(), rx)
        }));
    }

    let mut admitted = 0;
    let mut keep = Vec::new();
    for t in tasks {
        let (ok, rx) = t.await.unwrap();
        admitted += usize::from(ok);
        keep.push(rx);
    }
    assert_eq!(admitted, 10);
    assert_eq!(registry.connected_clients(), 10);
}

#[tokio::test]
async fn handlers_reach_registry_through_connection() {
    let registry = ConnectionRegistry::new("airplanes", 10);
    let (c, _rx) = conn("p1");
    assert!(c.registry().is_none());
    registry.register(Arc::clone(&c)).unwrap();

    assert_eq!(c.group(), Some("airplanes"));
    assert!(Arc::ptr_eq(&c.registry().unwrap(), &registry));

    registry.unregister(&c);
    assert!(c.is_closed());
    assert_eq!(registry.connected_clients(), 0);
}
