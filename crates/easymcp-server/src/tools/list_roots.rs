//! Tool: list_roots — Report the client's filesystem roots.

use serde_json::{json, Value};

use easymcp::response::{ToolContent, ToolDefinition};
use easymcp::McpResult;

use crate::protocol::ToolContext;

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "list_roots".to_string(),
        description: Some("List the roots the client has shared with this server".to_string()),
        input_schema: json!({ "type": "object", "properties": {} }),
        execution: None,
    }
}

pub async fn execute(_args: Value, ctx: &ToolContext) -> McpResult<Vec<ToolContent>> {
    let roots = ctx.client().list_roots().await?;

    if roots.is_empty() {
        return Ok(vec![ToolContent::text("The client shared no roots")]);
    }

    let lines: Vec<String> = roots
        .iter()
        .map(|root| match &root.name {
            Some(name) => format!("{name}: {}", root.uri),
            None => root.uri.clone(),
        })
        .collect();
    Ok(vec![ToolContent::text(lines.join("\n"))])
}
