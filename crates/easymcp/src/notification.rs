//! MCP notification types and the builders for server-emitted notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{to_wire, JsonRpcNotification};
use crate::task::TaskState;

pub mod methods {
    pub const PROGRESS: &str = "notifications/progress";
    pub const MESSAGE: &str = "notifications/message";
    pub const TASK_STATUS: &str = "notifications/tasks/status";
    pub const PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
    pub const RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
    pub const RESOURCE_UPDATED: &str = "notifications/resources/updated";
    pub const ELICITATION_COMPLETE: &str = "notifications/elicitation/complete";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    pub progress_token: ProgressToken,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Client log severity, declared least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LogLevel {
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Notice,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
        LogLevel::Alert,
        LogLevel::Emergency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
            LogLevel::Alert => "alert",
            LogLevel::Emergency => "emergency",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == value)
    }

    /// Whether a message at this level passes the given threshold.
    pub fn passes(self, threshold: LogLevel) -> bool {
        self >= threshold
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMessageParams {
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUpdatedParams {
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElicitationCompleteParams {
    pub elicitation_id: String,
}

pub fn progress(params: ProgressParams) -> JsonRpcNotification {
    JsonRpcNotification::new(methods::PROGRESS, Some(to_wire(&params)))
}

pub fn log_message(level: LogLevel, logger: Option<String>, data: Value) -> JsonRpcNotification {
    let params = LogMessageParams {
        level,
        logger,
        data,
    };
    JsonRpcNotification::new(methods::MESSAGE, Some(to_wire(&params)))
}

pub fn task_status(state: &TaskState) -> JsonRpcNotification {
    JsonRpcNotification::new(methods::TASK_STATUS, Some(to_wire(state)))
}

pub fn prompts_list_changed() -> JsonRpcNotification {
    JsonRpcNotification::new(methods::PROMPTS_LIST_CHANGED, None)
}

pub fn tools_list_changed() -> JsonRpcNotification {
    JsonRpcNotification::new(methods::TOOLS_LIST_CHANGED, None)
}

pub fn resources_list_changed() -> JsonRpcNotification {
    JsonRpcNotification::new(methods::RESOURCES_LIST_CHANGED, None)
}

pub fn resource_updated(uri: &str) -> JsonRpcNotification {
    let params = ResourceUpdatedParams {
        uri: uri.to_string(),
    };
    JsonRpcNotification::new(methods::RESOURCE_UPDATED, Some(to_wire(&params)))
}

pub fn elicitation_complete(elicitation_id: &str) -> JsonRpcNotification {
    let params = ElicitationCompleteParams {
        elicitation_id: elicitation_id.to_string(),
    };
    JsonRpcNotification::new(methods::ELICITATION_COMPLETE, Some(to_wire(&params)))
}
