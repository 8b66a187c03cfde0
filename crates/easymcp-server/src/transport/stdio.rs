//! Stdio transport — reads JSON-RPC from stdin, writes to stdout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use easymcp::{to_wire, JsonRpcError, McpError, McpResult, RequestId};

use super::{framing, MessageHandler, Transport};

/// Newline-delimited JSON over any reader/writer pair, stdin/stdout by default.
pub struct StdioTransport<R = Stdin, W = Stdout> {
    reader: Mutex<Option<BufReader<R>>>,
    writer: Mutex<W>,
    closed: AtomicBool,
}

impl StdioTransport<Stdin, Stdout> {
    pub fn new() -> Self {
        Self::with_io(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for StdioTransport<Stdin, Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(Some(BufReader::new(reader))),
            writer: Mutex::new(writer),
            closed: AtomicBool::new(false),
        }
    }

    async fn write_line(&self, value: &Value) -> McpResult<()> {
        let framed = framing::frame_message(value)?;
        let mut writer = self.writer.lock().await;
        writer
            .write_all(framed.as_bytes())
            .await
            .map_err(McpError::Io)?;
        writer.flush().await.map_err(McpError::Io)?;
        Ok(())
    }
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: Value) -> McpResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(McpError::Transport("stdio transport is closed".to_string()));
        }
        self.write_line(&message).await
    }

    async fn serve(&self, handler: Arc<dyn MessageHandler>) -> McpResult<()> {
        let mut reader = self
            .reader
            .lock()
            .await
            .take()
            .ok_or_else(|| McpError::Transport("stdio transport is already serving".to_string()))?;
        let mut line = String::new();

        tracing::info!("Stdio transport started");

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await.map_err(McpError::Io)?;

            if bytes_read == 0 {
                tracing::info!("EOF on stdin, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match framing::parse_message(trimmed) {
                Ok(message) => handler.handle_message(message).await,
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    let response = e.to_json_rpc_error(RequestId::Null);
                    self.send(to_wire::<JsonRpcError>(&response)).await?;
                }
            }
        }

        Ok(())
    }

    async fn close(&self) -> McpResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        writer.flush().await.map_err(McpError::Io)?;
        tracing::debug!("Stdio transport closed");
        Ok(())
    }
}
