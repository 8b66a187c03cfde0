//! The demo provider served by the `easymcp-server` binary.

use async_trait::async_trait;
use serde_json::{Map, Value};

use easymcp::request::{CompletionArgument, CompletionReference};
use easymcp::response::{
    CompletionValues, PromptDefinition, PromptGetResult, ResourceContent, ResourceDefinition,
    ToolContent, ToolDefinition,
};
use easymcp::{Implementation, McpResult};

use crate::prompts::PromptRegistry;
use crate::protocol::{RequestContext, ToolContext};
use crate::resources::ResourceRegistry;
use crate::tools::ToolRegistry;

use super::ServerProvider;

pub struct BuiltinProvider {
    info: Implementation,
}

impl BuiltinProvider {
    pub fn new() -> Self {
        let mut info = Implementation::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        info.title = Some("EasyMCP demo server".to_string());
        Self { info }
    }
}

impl Default for BuiltinProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerProvider for BuiltinProvider {
    async fn server_info(&self, _ctx: &RequestContext) -> Implementation {
        self.info.clone()
    }

    async fn instructions(&self, _ctx: &RequestContext) -> Option<String> {
        Some(
            "Demo server. Run `countdown` as a task to watch progress and status updates; \
             `summarize` and `list_roots` call back into the client."
                .to_string(),
        )
    }

    async fn list_prompts(&self, _ctx: &RequestContext) -> McpResult<Vec<PromptDefinition>> {
        Ok(PromptRegistry::list_prompts())
    }

    async fn get_prompt(
        &self,
        prompt: &PromptDefinition,
        arguments: Map<String, Value>,
        _ctx: &RequestContext,
    ) -> McpResult<PromptGetResult> {
        PromptRegistry::get(&prompt.name, &arguments)
    }

    async fn list_tools(&self, _ctx: &RequestContext) -> McpResult<Vec<ToolDefinition>> {
        Ok(ToolRegistry::list_tools())
    }

    async fn call_tool(
        &self,
        tool: &ToolDefinition,
        arguments: Value,
        ctx: &ToolContext,
    ) -> McpResult<Vec<ToolContent>> {
        ToolRegistry::call(&tool.name, arguments, ctx).await
    }

    async fn list_resources(&self, _ctx: &RequestContext) -> McpResult<Vec<ResourceDefinition>> {
        Ok(ResourceRegistry::list_resources())
    }

    async fn read_resource(
        &self,
        uri: &str,
        ctx: &RequestContext,
    ) -> McpResult<Option<Vec<ResourceContent>>> {
        ResourceRegistry::read(uri, ctx.protocol_version().await)
    }

    async fn complete(
        &self,
        reference: &CompletionReference,
        argument: &CompletionArgument,
        _ctx: &RequestContext,
    ) -> McpResult<Option<CompletionValues>> {
        Ok(match reference {
            CompletionReference::Prompt { name } => {
                PromptRegistry::complete(name, &argument.name, &argument.value)
            }
            CompletionReference::Resource { .. } => None,
        })
    }

    async fn on_connect(&self, ctx: &RequestContext) -> McpResult<()> {
        tracing::info!("Client connected");
        ctx.log().named("easymcp").info("Demo server ready").await
    }

    async fn on_roots_changed(&self, ctx: &RequestContext) -> McpResult<()> {
        let roots = ctx.client().list_roots().await?;
        tracing::info!("Client now shares {} roots", roots.len());
        Ok(())
    }
}
