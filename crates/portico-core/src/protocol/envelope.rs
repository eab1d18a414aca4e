//! WebSocket message envelope.
//!
//! Every inbound frame carries a common header (`OpCode`, `MessageId`,
//! `SessionId`) next to its type-specific fields. The header is parsed first;
//! the body is then resolved by opcode.

use std::any::Any;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opcode reserved for client keep-alive messages.
pub const PING_OP_CODE: i32 = 0;

/// Common header of every message (JSON field names are PascalCase).
/// Missing fields take their zero value, so a bare object is a keep-alive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageHeader {
    #[serde(default)]
    pub op_code: i32,
    #[serde(default)]
    pub message_id: u64,
    #[serde(default)]
    pub session_id: String,
}

impl MessageHeader {
    pub fn new(op_code: i32) -> Self {
        Self { op_code, ..Self::default() }
    }

    pub fn with_message_id(mut self, message_id: u64) -> Self {
        self.message_id = message_id;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }
}

/// Decoded message body.
pub enum Body {
    /// Keep-alive (opcode 0 without a registered factory).
    Ping,
    /// Value produced by the factory registered for the opcode.
    Typed(Box<dyn Any + Send + Sync>),
    /// No factory for the opcode: the whole frame, untouched.
    Raw(Bytes),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Ping => f.write_str("Ping"),
            Body::Typed(_) => f.write_str("Typed(..)"),
            Body::Raw(b) => write!(f, "Raw({} bytes)", b.len()),
        }
    }
}

/// One decoded inbound message.
#[derive(Debug)]
pub struct Envelope {
    pub header: MessageHeader,
    pub body: Body,
}

impl Envelope {
    pub fn new(header: MessageHeader, body: Body) -> Self {
        Self { header, body }
    }

    pub fn op_code(&self) -> i32 {
        self.header.op_code
    }

    pub fn message_id(&self) -> u64 {
        self.header.message_id
    }

    pub fn session_id(&self) -> &str {
        &self.header.session_id
    }

    pub fn is_ping(&self) -> bool {
        matches!(self.body, Body::Ping)
    }

    /// Borrow the typed body, if the factory produced a `T`.
    pub fn typed<T: Any>(&self) -> Option<&T> {
        match &self.body {
            Body::Typed(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Raw frame bytes for opcodes without a factory.
    pub fn raw(&self) -> Option<&Bytes> {
        match &self.body {
            Body::Raw(b) => Some(b),
            _ => None,
        }
    }
}
