//! Tool: echo — Return the message it was given.

use serde::Deserialize;
use serde_json::{json, Value};

use easymcp::response::{TaskSupport, ToolContent, ToolDefinition};
use easymcp::{McpError, McpResult};

use crate::protocol::ToolContext;

#[derive(Debug, Deserialize)]
struct EchoParams {
    message: String,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "echo".to_string(),
        description: Some("Return the message unchanged".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "message": { "type": "string", "description": "Text to send back" }
            },
            "required": ["message"]
        }),
        execution: None,
    }
    .with_task_support(TaskSupport::Forbidden)
}

pub async fn execute(args: Value, ctx: &ToolContext) -> McpResult<Vec<ToolContent>> {
    let params: EchoParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    ctx.log().debug(&format!("echo: {}", params.message)).await?;
    Ok(vec![ToolContent::text(params.message)])
}
