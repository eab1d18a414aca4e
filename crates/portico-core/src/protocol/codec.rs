//! Pluggable envelope codec.
//!
//! The default `JsonDecoder` parses the header once, then resolves the body:
//! a registered factory turns the frame into a typed value, opcode 0 becomes a
//! keep-alive, and anything else is kept raw so handlers can parse it lazily.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::protocol::envelope::{Body, Envelope, MessageHeader, PING_OP_CODE};

/// Builds the typed body for one opcode from the full frame.
pub type MessageFactory =
    Arc<dyn Fn(&[u8]) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Factory that deserializes the whole frame into `T`.
pub fn factory_for<T>() -> MessageFactory
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    Arc::new(|frame: &[u8]| {
        let value: T = serde_json::from_slice(frame)
            .map_err(|e| GatewayError::Decode(format!("typed body: {e}")))?;
        Ok(Box::new(value) as Box<dyn Any + Send + Sync>)
    })
}

/// Frame codec used by a WebSocket endpoint.
pub trait MessageDecoder: Send + Sync {
    /// Decode one inbound frame.
    fn decode(&self, frame: &[u8]) -> Result<Envelope>;

    /// Encode an outbound message: header plus type-specific fields.
    fn encode(&self, header: &MessageHeader, fields: Value) -> Result<Bytes>;
}

/// JSON envelope codec with per-opcode factories.
#[derive(Default, Clone)]
pub struct JsonDecoder {
    factories: HashMap<i32, MessageFactory>,
}

impl JsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `op_code`.
    pub fn with_factory(mut self, op_code: i32, factory: MessageFactory) -> Self {
        self.factories.insert(op_code, factory);
        self
    }

    pub fn register<T>(self, op_code: i32) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        self.with_factory(op_code, factory_for::<T>())
    }

    pub fn has_factory(&self, op_code: i32) -> bool {
        self.factories.contains_key(&op_code)
    }
}

impl MessageDecoder for JsonDecoder {
    fn decode(&self, frame: &[u8]) -> Result<Envelope> {
        let header: MessageHeader = serde_json::from_slice(frame)
            .map_err(|e| GatewayError::Decode(format!("invalid envelope json: {e}")))?;

        let body = match self.factories.get(&header.op_code) {
            Some(factory) => Body::Typed(factory(frame)?),
            None if header.op_code == PING_OP_CODE => Body::Ping,
            None => {
                tracing::trace!(op_code = header.op_code, "no factory; keeping raw body");
                Body::Raw(Bytes::copy_from_slice(frame))
            }
        };

        Ok(Envelope::new(header, body))
    }

    fn encode(&self, header: &MessageHeader, fields: Value) -> Result<Bytes> {
        let mut out = match fields {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(GatewayError::BadRequest(format!(
                    "message fields must be a JSON object, got {other}"
                )))
            }
        };

        let header = serde_json::to_value(header)
            .map_err(|e| GatewayError::Internal(format!("header encode failed: {e}")))?;
        if let Value::Object(h) = header {
            out.extend(h);
        }

        serde_json::to_vec(&Value::Object(out))
            .map(Bytes::from)
            .map_err(|e| GatewayError::Internal(format!("json encode failed: {e}")))
    }
}
