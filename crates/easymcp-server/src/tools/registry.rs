//! Tool registration and dispatch.

use serde_json::Value;

use easymcp::response::{ToolContent, ToolDefinition};
use easymcp::{McpError, McpResult};

use crate::protocol::ToolContext;

use super::{countdown, echo, list_roots, summarize};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            echo::definition(),
            countdown::definition(),
            summarize::definition(),
            list_roots::definition(),
        ]
    }

    pub async fn call(name: &str, args: Value, ctx: &ToolContext) -> McpResult<Vec<ToolContent>> {
        match name {
            "echo" => echo::execute(args, ctx).await,
            "countdown" => countdown::execute(args, ctx).await,
            "summarize" => summarize::execute(args, ctx).await,
            "list_roots" => list_roots::execute(args, ctx).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}
