//! Tool: countdown — Count down in steps, reporting progress.
//!
//! Long enough to be worth running as a task. Each step reports progress,
//! refreshes the task status, and stops early when cancelled.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use easymcp::response::{ToolContent, ToolDefinition};
use easymcp::{McpError, McpResult};

use crate::protocol::ToolContext;

const MAX_STEPS: u32 = 100;

#[derive(Debug, Deserialize)]
struct CountdownParams {
    #[serde(default = "default_from")]
    from: u32,
    #[serde(default = "default_interval_ms")]
    interval_ms: u64,
}

fn default_from() -> u32 {
    3
}

fn default_interval_ms() -> u64 {
    100
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "countdown".to_string(),
        description: Some("Count down from a number, one step per interval".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "from": { "type": "integer", "minimum": 1, "maximum": MAX_STEPS, "default": 3 },
                "interval_ms": { "type": "integer", "minimum": 0, "default": 100 }
            }
        }),
        execution: None,
    }
}

pub async fn execute(args: Value, ctx: &ToolContext) -> McpResult<Vec<ToolContent>> {
    let params: CountdownParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;
    if params.from == 0 || params.from > MAX_STEPS {
        return Err(McpError::InvalidParams(format!(
            "'from' must be between 1 and {MAX_STEPS}"
        )));
    }

    let total = f64::from(params.from);
    let interval = Duration::from_millis(params.interval_ms);

    for done in 1..=params.from {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = ctx.cancellation().cancelled() => return Err(McpError::RequestCancelled),
        }

        let remaining = params.from - done;
        ctx.progress()
            .report(f64::from(done), Some(total), Some(&format!("{remaining} left")))
            .await?;
        ctx.continue_task(Some(&format!("{remaining} steps remaining")))
            .await?;
    }

    Ok(vec![ToolContent::text(format!(
        "Liftoff after {} steps",
        params.from
    ))])
}
