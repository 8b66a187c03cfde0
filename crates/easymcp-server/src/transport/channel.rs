//! In-process transport over unbounded channels, for embedding and tests.
//!
//! ```text
//! engine send()  -> outbound -> peer.receiver
//! peer.sender    -> inbound  -> engine serve()
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use easymcp::{McpError, McpResult};

use super::{MessageHandler, Transport};

pub struct ChannelTransport {
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    outbound: mpsc::UnboundedSender<Value>,
    closed: AtomicBool,
}

/// The client end of a [`ChannelTransport`].
pub struct ChannelPeer {
    /// Messages for the engine.
    pub sender: mpsc::UnboundedSender<Value>,
    /// Messages from the engine.
    pub receiver: mpsc::UnboundedReceiver<Value>,
}

impl ChannelTransport {
    pub fn pair() -> (Self, ChannelPeer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let transport = Self {
            inbound: Mutex::new(Some(inbound_rx)),
            outbound: outbound_tx,
            closed: AtomicBool::new(false),
        };
        let peer = ChannelPeer {
            sender: inbound_tx,
            receiver: outbound_rx,
        };
        (transport, peer)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, message: Value) -> McpResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(McpError::Transport("channel transport is closed".to_string()));
        }
        self.outbound
            .send(message)
            .map_err(|_| McpError::Transport("peer receiver dropped".to_string()))
    }

    async fn serve(&self, handler: Arc<dyn MessageHandler>) -> McpResult<()> {
        let mut inbound = self
            .inbound
            .lock()
            .await
            .take()
            .ok_or_else(|| McpError::Transport("channel transport is already serving".to_string()))?;

        while let Some(message) = inbound.recv().await {
            handler.handle_message(message).await;
        }

        tracing::debug!("Channel peer hung up");
        Ok(())
    }

    async fn close(&self) -> McpResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
