//! WebSocket message protocol.
//!
//! - `envelope`: the common `OpCode`/`MessageId`/`SessionId` header and the
//!   decoded body variants (ping, typed, raw).
//! - `codec`: the pluggable `MessageDecoder` and its JSON implementation.
//!
//! Decoding never panics: malformed frames surface as `GatewayError::Decode`
//! so the transport can drop the frame and keep the session alive.

pub mod codec;
pub mod envelope;

pub use codec::{factory_for, JsonDecoder, MessageDecoder, MessageFactory};
pub use envelope::{Body, Envelope, MessageHeader, PING_OP_CODE};
