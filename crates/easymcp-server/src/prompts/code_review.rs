//! Prompt: code_review — Ask for a review of a code snippet.

use serde_json::{Map, Value};

use easymcp::response::{PromptGetResult, PromptMessage, Role, ToolContent};
use easymcp::{McpError, McpResult};

pub fn expand(args: &Map<String, Value>) -> McpResult<PromptGetResult> {
    let code = args
        .get("code")
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::InvalidParams("Missing required argument: code".to_string()))?;
    let language = args.get("language").and_then(Value::as_str);

    let fence = language.unwrap_or("");
    let subject = match language {
        Some(language) => format!("this {language} code"),
        None => "this code".to_string(),
    };

    let text = format!(
        "Please review {subject}.\n\n\
         ```{fence}\n{code}\n```\n\n\
         Point out:\n\
         1. Bugs and incorrect edge-case handling\n\
         2. Unclear naming or structure\n\
         3. Missing tests"
    );

    Ok(PromptGetResult {
        description: Some("Code review request".to_string()),
        messages: vec![PromptMessage {
            role: Role::User,
            content: ToolContent::text(text),
        }],
    })
}
