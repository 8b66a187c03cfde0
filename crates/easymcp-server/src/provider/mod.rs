//! The seam between the engine and an application serving prompts, tools,
//! and resources.
//!
//! Every method but [`ServerProvider::server_info`] has a default, so a
//! provider only implements the surfaces it offers.

pub mod builtin;

use async_trait::async_trait;
use serde_json::{Map, Value};

use easymcp::request::{CompletionArgument, CompletionReference};
use easymcp::response::{
    CompletionValues, PromptDefinition, PromptGetResult, ResourceContent, ResourceDefinition,
    ToolContent, ToolDefinition,
};
use easymcp::{Implementation, McpError, McpResult, ServerCapabilities};

use crate::protocol::{RequestContext, ToolContext};

pub use builtin::BuiltinProvider;

#[async_trait]
pub trait ServerProvider: Send + Sync + 'static {
    /// Identity reported in the `initialize` result.
    async fn server_info(&self, ctx: &RequestContext) -> Implementation;

    async fn instructions(&self, _ctx: &RequestContext) -> Option<String> {
        None
    }

    /// Capabilities to advertise. `None` falls back to the server configuration.
    async fn capabilities(&self, _ctx: &RequestContext) -> Option<ServerCapabilities> {
        None
    }

    async fn list_prompts(&self, _ctx: &RequestContext) -> McpResult<Vec<PromptDefinition>> {
        Ok(Vec::new())
    }

    /// Expand `prompt`, already resolved from the client's requested name.
    async fn get_prompt(
        &self,
        prompt: &PromptDefinition,
        _arguments: Map<String, Value>,
        _ctx: &RequestContext,
    ) -> McpResult<PromptGetResult> {
        Err(McpError::PromptNotFound(prompt.name.clone()))
    }

    async fn list_tools(&self, _ctx: &RequestContext) -> McpResult<Vec<ToolDefinition>> {
        Ok(Vec::new())
    }

    /// Run `tool`. Under task-augmented execution `ctx` carries the task and
    /// its cancellation token.
    async fn call_tool(
        &self,
        tool: &ToolDefinition,
        _arguments: Value,
        _ctx: &ToolContext,
    ) -> McpResult<Vec<ToolContent>> {
        Err(McpError::ToolNotFound(tool.name.clone()))
    }

    async fn list_resources(&self, _ctx: &RequestContext) -> McpResult<Vec<ResourceDefinition>> {
        Ok(Vec::new())
    }

    /// `Ok(None)` reports the resource as not found.
    async fn read_resource(
        &self,
        _uri: &str,
        _ctx: &RequestContext,
    ) -> McpResult<Option<Vec<ResourceContent>>> {
        Ok(None)
    }

    /// Candidate values for one argument. `Ok(None)` means no suggestions.
    async fn complete(
        &self,
        _reference: &CompletionReference,
        _argument: &CompletionArgument,
        _ctx: &RequestContext,
    ) -> McpResult<Option<CompletionValues>> {
        Ok(None)
    }

    /// Called once the client confirms initialization.
    async fn on_connect(&self, _ctx: &RequestContext) -> McpResult<()> {
        Ok(())
    }

    async fn on_roots_changed(&self, _ctx: &RequestContext) -> McpResult<()> {
        Ok(())
    }
}
