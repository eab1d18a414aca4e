use axum::extract::ws::Message;
use bytes::Bytes;
use serde::Serialize;

use portico_core::{GatewayError, Result};

/// Message cached for broadcasting (serialize once, send N times).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedMsg {
    Text(String),
    Binary(Bytes),
}

impl PreparedMsg {
    /// UTF-8 payloads go out as text frames, anything else as binary.
    pub fn from_bytes(payload: Bytes) -> Self {
        match std::str::from_utf8(&payload) {
            Ok(s) => PreparedMsg::Text(s.to_owned()),
            Err(_) => PreparedMsg::Binary(payload),
        }
    }

    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_string(value)
            .map(PreparedMsg::Text)
            .map_err(|e| GatewayError::BadRequest(format!("json encode failed: {e}")))
    }

    pub fn len(&self) -> usize {
        match self {
            PreparedMsg::Text(s) => s.len(),
            PreparedMsg::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to axum::ws::Message for transport.
    /// NOTE: axum::Message::Binary requires Vec<u8>, so Binary path clones into Vec.
    pub fn to_ws_message(&self) -> Message {
        match self {
            PreparedMsg::Text(s) => Message::Text(s.clone()),
            PreparedMsg::Binary(b) => Message::Binary(b.to_vec()),
        }
    }
}
