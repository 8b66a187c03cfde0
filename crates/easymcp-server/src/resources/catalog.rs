//! Resource: easymcp://tools/catalog

use serde_json::json;

use easymcp::response::{ResourceContent, ResourceDefinition, ToolDefinition};
use easymcp::McpResult;

pub const URI: &str = "easymcp://tools/catalog";

pub fn definition() -> ResourceDefinition {
    ResourceDefinition {
        uri: URI.to_string(),
        name: "tool-catalog".to_string(),
        description: Some("Every tool this server offers and how it may run".to_string()),
        mime_type: Some("application/json".to_string()),
    }
}

pub fn read(tools: &[ToolDefinition]) -> McpResult<Vec<ResourceContent>> {
    let entries: Vec<_> = tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "taskSupport": tool.task_support(),
            })
        })
        .collect();

    Ok(vec![ResourceContent::text(
        URI,
        "application/json",
        serde_json::to_string_pretty(&json!({ "tools": entries }))?,
    )])
}
