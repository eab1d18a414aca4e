use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use portico_core::protocol::Envelope;
use portico_core::{GatewayError, Result};

use crate::dispatch::MessageHandler;
use crate::realtime::Connection;

pub const CHAT_OP_CODE: i32 = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChatMessage {
    pub text: String,
}

/// Broadcasts chat text to every connection of the sender's group.
pub struct ChatService;

#[async_trait]
impl MessageHandler for ChatService {
    async fn handle(&self, env: Envelope, conn: Arc<Connection>) -> Result<()> {
        let msg = env
            .typed::<ChatMessage>()
            .ok_or_else(|| GatewayError::BadRequest("chat requires a Text field".into()))?;
        let registry = conn
            .registry()
            .ok_or_else(|| GatewayError::Internal("connection has no registry".into()))?;

        let out = json!({
            "OpCode": CHAT_OP_CODE,
            "MessageId": env.message_id(),
            "SessionId": env.session_id(),
            "From": conn.id(),
            "Text": msg.text,
        });
        let delivered = registry.broadcast_json(&out).await?;
        tracing::debug!(group = %registry.group(), delivered, "chat broadcast");
        Ok(())
    }
}
