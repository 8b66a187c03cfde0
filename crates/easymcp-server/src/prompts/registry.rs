//! Prompt registration, expansion, and argument completion.

use serde_json::{Map, Value};

use easymcp::response::{CompletionValues, PromptArgument, PromptDefinition, PromptGetResult};
use easymcp::{McpError, McpResult};

use super::{code_review, explain};

/// Values offered when completing a `language` argument.
const LANGUAGES: &[&str] = &[
    "bash", "c", "cpp", "csharp", "go", "haskell", "java", "javascript", "kotlin", "python",
    "ruby", "rust", "scala", "sql", "swift", "typescript", "zig",
];

pub struct PromptRegistry;

impl PromptRegistry {
    pub fn list_prompts() -> Vec<PromptDefinition> {
        vec![
            PromptDefinition {
                name: "code_review".to_string(),
                description: Some("Ask for a review of a code snippet".to_string()),
                arguments: Some(vec![
                    PromptArgument {
                        name: "code".to_string(),
                        description: Some("The code to review".to_string()),
                        required: true,
                    },
                    PromptArgument {
                        name: "language".to_string(),
                        description: Some("Programming language of the snippet".to_string()),
                        required: false,
                    },
                ]),
            },
            PromptDefinition {
                name: "explain".to_string(),
                description: Some("Explain a concept".to_string()),
                arguments: Some(vec![
                    PromptArgument {
                        name: "topic".to_string(),
                        description: Some("What to explain".to_string()),
                        required: true,
                    },
                    PromptArgument {
                        name: "language".to_string(),
                        description: Some("Language for code examples".to_string()),
                        required: false,
                    },
                ]),
            },
        ]
    }

    pub fn get(name: &str, args: &Map<String, Value>) -> McpResult<PromptGetResult> {
        match name {
            "code_review" => code_review::expand(args),
            "explain" => explain::expand(args),
            _ => Err(McpError::PromptNotFound(name.to_string())),
        }
    }

    /// Complete `argument` of `prompt` from its current `value` prefix.
    pub fn complete(prompt: &str, argument: &str, value: &str) -> Option<CompletionValues> {
        let known = Self::list_prompts().into_iter().any(|p| {
            p.name == prompt
                && p.arguments
                    .unwrap_or_default()
                    .iter()
                    .any(|a| a.name == argument)
        });
        if !known || argument != "language" {
            return None;
        }

        let prefix = value.to_lowercase();
        let values: Vec<String> = LANGUAGES
            .iter()
            .filter(|lang| lang.starts_with(&prefix))
            .map(|lang| lang.to_string())
            .collect();
        Some(CompletionValues {
            total: Some(values.len()),
            values,
            has_more: false,
        })
    }
}
