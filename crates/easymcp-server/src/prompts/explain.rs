//! Prompt: explain — Explain a concept, optionally with examples in a language.

use serde_json::{Map, Value};

use easymcp::response::{PromptGetResult, PromptMessage, Role, ToolContent};
use easymcp::{McpError, McpResult};

pub fn expand(args: &Map<String, Value>) -> McpResult<PromptGetResult> {
    let topic = args
        .get("topic")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::InvalidParams("Missing required argument: topic".to_string()))?;

    let examples = match args.get("language").and_then(Value::as_str) {
        Some(language) => format!(" Use {language} for any code examples."),
        None => String::new(),
    };

    Ok(PromptGetResult {
        description: Some(format!("Explanation of {topic}")),
        messages: vec![PromptMessage {
            role: Role::User,
            content: ToolContent::text(format!(
                "Explain {topic} to an experienced engineer new to the subject.{examples}"
            )),
        }],
    })
}
