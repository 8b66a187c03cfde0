//! Tool: summarize — Ask the client's model to summarize text.

use serde::Deserialize;
use serde_json::{json, Value};

use easymcp::request::{CreateMessageParams, SamplingMessage};
use easymcp::response::{ToolContent, ToolDefinition};
use easymcp::{McpError, McpResult};

use crate::protocol::ToolContext;

#[derive(Debug, Deserialize)]
struct SummarizeParams {
    text: String,
    #[serde(default)]
    max_tokens: Option<u32>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "summarize".to_string(),
        description: Some("Summarize text using the client's language model".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Text to summarize" },
                "max_tokens": { "type": "integer", "minimum": 1 }
            },
            "required": ["text"]
        }),
        execution: None,
    }
}

pub async fn execute(args: Value, ctx: &ToolContext) -> McpResult<Vec<ToolContent>> {
    let params: SummarizeParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let mut request = CreateMessageParams::new(vec![SamplingMessage::user(format!(
        "Summarize the following text in a few sentences:\n\n{}",
        params.text
    ))]);
    request.system_prompt = Some("You are a concise technical summarizer.".to_string());
    if let Some(max_tokens) = params.max_tokens {
        request.max_tokens = max_tokens;
    }

    let reply = ctx.client().create_message(request).await?;
    tracing::debug!("summarize answered by model {}", reply.model);
    Ok(vec![reply.content])
}
