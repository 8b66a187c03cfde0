//! Task state machine.
//!
//! A task is a tool invocation promoted to background execution. Its status
//! moves through [`transition`], the only function allowed to change it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{McpError, McpResult};

/// Status message given to freshly created tasks.
pub const TASK_STARTED_MESSAGE: &str = "The task has started";

/// `_meta` key linking a result to the task that produced it.
pub const RELATED_TASK_META_KEY: &str = "io.modelcontextprotocol/related-task";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Working,
    InputRequired,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Working => "working",
            TaskStatus::InputRequired => "input_required",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-visible snapshot of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskState {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Retention in milliseconds after reaching a terminal status. `None` keeps it forever.
    pub ttl: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
}

impl TaskState {
    pub fn new(task_id: impl Into<String>, ttl: Option<u64>, poll_interval: Option<u64>) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Working,
            status_message: Some(TASK_STARTED_MESSAGE.to_string()),
            ttl,
            created_at: now,
            last_updated_at: now,
            poll_interval,
        }
    }
}

/// Apply a status change to `state`, refreshing its message and timestamp.
///
/// Non-terminal states may move anywhere, including to themselves to refresh
/// the status message. Terminal states are final.
pub fn transition(
    state: &mut TaskState,
    to: TaskStatus,
    message: Option<String>,
) -> McpResult<()> {
    if state.status.is_terminal() {
        return Err(McpError::InvalidTaskTransition {
            task_id: state.task_id.clone(),
            from: state.status,
            to,
        });
    }
    state.status = to;
    if message.is_some() {
        state.status_message = message;
    }
    state.last_updated_at = Utc::now();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_working() {
        let state = TaskState::new("t1", Some(15_000), Some(5_000));
        assert_eq!(state.status, TaskStatus::Working);
        assert_eq!(state.status_message.as_deref(), Some(TASK_STARTED_MESSAGE));
        assert_eq!(state.created_at, state.last_updated_at);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Working.is_terminal());
        assert!(!TaskStatus::InputRequired.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_input_required_round_trip() {
        let mut state = TaskState::new("t1", None, None);
        transition(
            &mut state,
            TaskStatus::InputRequired,
            Some("need a name".into()),
        )
        .unwrap();
        assert_eq!(state.status, TaskStatus::InputRequired);
        transition(&mut state, TaskStatus::Working, Some("resumed".into())).unwrap();
        assert_eq!(state.status, TaskStatus::Working);
        assert_eq!(state.status_message.as_deref(), Some("resumed"));
    }

    #[test]
    fn test_terminal_is_final() {
        let mut state = TaskState::new("t1", None, None);
        transition(&mut state, TaskStatus::Completed, None).unwrap();
        let err = transition(&mut state, TaskStatus::Cancelled, None).unwrap_err();
        assert!(matches!(err, McpError::InvalidTaskTransition { .. }));
        assert_eq!(state.status, TaskStatus::Completed);
    }

    #[test]
    fn test_serializes_snake_case_status() {
        let state = TaskState::new("abc", None, Some(5_000));
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["taskId"], "abc");
        assert_eq!(value["status"], "working");
        assert!(value["ttl"].is_null());
        assert_eq!(value["pollInterval"], 5_000);
        assert_eq!(
            serde_json::to_value(TaskStatus::InputRequired).unwrap(),
            "input_required"
        );
    }
}
