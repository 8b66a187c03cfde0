//! Shared helpers for the engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use easymcp::request::{CompletionArgument, CompletionReference};
use easymcp::response::{
    CompletionValues, PromptDefinition, PromptGetResult, PromptMessage, Role, TaskSupport,
    ToolContent, ToolDefinition,
};
use easymcp::{Implementation, LogLevel, McpError, McpResult};
use easymcp_server::config::ServerConfig;
use easymcp_server::protocol::{ProtocolHandler, RequestContext, ToolContext};
use easymcp_server::provider::ServerProvider;
use easymcp_server::transport::ChannelTransport;

// ─────────────────────── provider ───────────────────────

/// A provider whose tools poke at every engine surface.
pub struct TestProvider {
    prompt_count: usize,
    pub connects: Arc<AtomicUsize>,
}

impl TestProvider {
    pub fn new() -> Self {
        Self::with_prompts(3)
    }

    pub fn with_prompts(prompt_count: usize) -> Self {
        Self {
            prompt_count,
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn tool(name: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: None,
        input_schema: json!({ "type": "object" }),
        execution: None,
    }
}

fn text(value: impl Into<String>) -> McpResult<Vec<ToolContent>> {
    Ok(vec![ToolContent::text(value)])
}

#[async_trait]
impl ServerProvider for TestProvider {
    async fn server_info(&self, _ctx: &RequestContext) -> Implementation {
        Implementation::new("test-server", "0.0.1")
    }

    async fn list_prompts(&self, _ctx: &RequestContext) -> McpResult<Vec<PromptDefinition>> {
        Ok((0..self.prompt_count)
            .map(|i| PromptDefinition::new(format!("prompt-{i:03}")))
            .collect())
    }

    async fn get_prompt(
        &self,
        prompt: &PromptDefinition,
        _arguments: Map<String, Value>,
        _ctx: &RequestContext,
    ) -> McpResult<PromptGetResult> {
        Ok(PromptGetResult {
            description: None,
            messages: vec![PromptMessage {
                role: Role::User,
                content: ToolContent::text(format!("expanded {}", prompt.name)),
            }],
        })
    }

    async fn list_tools(&self, _ctx: &RequestContext) -> McpResult<Vec<ToolDefinition>> {
        Ok(vec![
            tool("slow"),
            tool("log_all"),
            tool("touch"),
            tool("roots"),
            tool("work"),
            tool("boom"),
            tool("ask"),
            tool("plain").with_task_support(TaskSupport::Forbidden),
            tool("only_task").with_task_support(TaskSupport::Required),
        ])
    }

    async fn call_tool(
        &self,
        tool: &ToolDefinition,
        arguments: Value,
        ctx: &ToolContext,
    ) -> McpResult<Vec<ToolContent>> {
        match tool.name.as_str() {
            "slow" => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(10)) => text("finally"),
                    _ = ctx.cancellation().cancelled() => Err(McpError::RequestCancelled),
                }
            }
            "log_all" => {
                for level in LogLevel::ALL {
                    ctx.log().log(level, &format!("{level} line"), None).await?;
                }
                text("logged")
            }
            "touch" => {
                let uri = arguments["uri"].as_str().unwrap_or_default();
                ctx.notify().resource_updated(uri).await?;
                text("sent")
            }
            "roots" => {
                let roots = ctx.client().list_roots().await?;
                text(
                    roots
                        .iter()
                        .map(|r| r.uri.as_str())
                        .collect::<Vec<_>>()
                        .join(","),
                )
            }
            "work" => {
                let ms = arguments["ms"].as_u64().unwrap_or(50);
                ctx.continue_task(Some("halfway")).await?;
                tokio::time::sleep(Duration::from_millis(ms)).await;
                text("done")
            }
            "boom" => Err(McpError::InternalError("boom".to_string())),
            "ask" => {
                ctx.require_input("need input").await?;
                ctx.continue_task(Some("resumed")).await?;
                text("answered")
            }
            "plain" => text("plain"),
            "only_task" => text("tasked"),
            other => Err(McpError::ToolNotFound(other.to_string())),
        }
    }

    async fn complete(
        &self,
        _reference: &CompletionReference,
        _argument: &CompletionArgument,
        _ctx: &RequestContext,
    ) -> McpResult<Option<CompletionValues>> {
        Ok(Some(CompletionValues {
            values: vec!["zeta".into(), "alpha".into(), "mid".into()],
            total: None,
            has_more: false,
        }))
    }

    async fn on_connect(&self, _ctx: &RequestContext) -> McpResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ─────────────────────── client ───────────────────────

/// Build an MCP JSON-RPC request.
pub fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

/// Build an MCP JSON-RPC notification.
pub fn mcp_notification(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params
    })
}

/// Drives a [`ProtocolHandler`] over a [`ChannelTransport`] the way a client would.
pub struct TestClient {
    pub handler: ProtocolHandler,
    receiver: mpsc::UnboundedReceiver<Value>,
    _sender: mpsc::UnboundedSender<Value>,
    /// Messages seen while waiting for a specific response.
    pub backlog: Vec<Value>,
}

impl TestClient {
    pub fn new(config: ServerConfig, provider: TestProvider) -> Self {
        let (transport, peer) = ChannelTransport::pair();
        let handler = ProtocolHandler::new(config, Arc::new(provider), Arc::new(transport));
        Self {
            handler,
            receiver: peer.receiver,
            _sender: peer.sender,
            backlog: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ServerConfig::default(), TestProvider::new())
    }

    pub async fn send(&self, message: Value) {
        self.handler.handle_message(message).await;
    }

    /// Next message from the engine, failing the test after two seconds.
    pub async fn next(&mut self) -> Value {
        tokio::time::timeout(Duration::from_secs(2), self.receiver.recv())
            .await
            .expect("timed out waiting for the engine")
            .expect("engine transport closed")
    }

    /// Wait for the response to `id`, parking everything else in the backlog.
    pub async fn response(&mut self, id: i64) -> Value {
        loop {
            let message = self.next().await;
            if message.get("method").is_none() && message["id"] == id {
                return message;
            }
            self.backlog.push(message);
        }
    }

    pub async fn request(&mut self, id: i64, method: &str, params: Value) -> Value {
        self.send(mcp_request(id, method, params)).await;
        self.response(id).await
    }

    pub async fn initialize(&mut self, version: &str) -> Value {
        self.request(
            0,
            "initialize",
            json!({
                "protocolVersion": version,
                "capabilities": { "roots": { "listChanged": true } },
                "clientInfo": { "name": "test-client", "version": "1.0" }
            }),
        )
        .await
    }

    /// Remove and return backlog messages with the given method.
    pub fn take_notifications(&mut self, method: &str) -> Vec<Value> {
        let (matching, rest): (Vec<Value>, Vec<Value>) = std::mem::take(&mut self.backlog)
            .into_iter()
            .partition(|m| m["method"] == method);
        self.backlog = rest;
        matching
    }

    /// Assert nothing else has been sent.
    pub fn assert_quiet(&mut self) {
        if let Ok(message) = self.receiver.try_recv() {
            panic!("unexpected message: {message}");
        }
    }
}
