//! Transport layer for MCP communication.
//!
//! A transport moves decoded JSON envelopes between the engine and the peer.
//! It knows nothing about the protocol beyond framing.

pub mod channel;
pub mod framing;
pub mod stdio;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use easymcp::McpResult;

pub use channel::{ChannelPeer, ChannelTransport};
pub use stdio::StdioTransport;

/// Receives every decoded message a transport reads, in arrival order.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, message: Value);
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one envelope to the peer.
    async fn send(&self, message: Value) -> McpResult<()>;

    /// Read messages until the peer goes away, passing each to `handler`.
    /// The transport stays open for replies; the caller closes it.
    async fn serve(&self, handler: Arc<dyn MessageHandler>) -> McpResult<()>;

    /// Release transport resources. Later sends fail.
    async fn close(&self) -> McpResult<()>;
}
