use std::sync::Arc;

use async_trait::async_trait;

use portico_core::protocol::Envelope;
use portico_core::Result;

use crate::dispatch::MessageHandler;
use crate::realtime::Connection;

pub const ECHO_OP_CODE: i32 = 1;

/// Sends the raw frame back to the sender. Useful to prove opcode routing.
pub struct EchoService;

#[async_trait]
impl MessageHandler for EchoService {
    async fn handle(&self, env: Envelope, conn: Arc<Connection>) -> Result<()> {
        match env.raw() {
            Some(raw) => conn.send_raw(raw.clone()).await,
            None => Ok(()),
        }
    }
}
