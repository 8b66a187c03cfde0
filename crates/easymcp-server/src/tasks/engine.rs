//! Task engine: background tool executions with a status state machine.
//!
//! A task is created `working`, runs its tool under its own cancellation
//! token, and reaches exactly one terminal status. The first terminal status
//! wins: a cancelled task stays cancelled even if its execution later returns.
//! The final response is cached before the entry becomes eligible for reclaim,
//! and entries are reclaimed `ttl` milliseconds after reaching a terminal
//! status. Running tasks never expire.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use easymcp::error::mcp_error_codes;
use easymcp::response::{ToolCallResult, ToolContent};
use easymcp::task::transition;
use easymcp::{to_wire, JsonRpcErrorObject, McpError, McpResult, TaskState, TaskStatus};

/// The cached final response of a task: a tool result or an error object.
pub type TaskOutcome = Result<Value, JsonRpcErrorObject>;

#[derive(Debug)]
struct TaskEntry {
    state: TaskState,
    token: CancellationToken,
    outcome: watch::Sender<Option<TaskOutcome>>,
    seq: u64,
}

#[derive(Debug)]
pub struct TaskEngine {
    tasks: Mutex<HashMap<String, TaskEntry>>,
    seq: AtomicU64,
    default_ttl: Option<u64>,
    poll_interval: u64,
}

impl TaskEngine {
    pub fn new(default_ttl: Option<u64>, poll_interval: u64) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
            default_ttl,
            poll_interval,
        }
    }

    /// Register a new `working` task. `ttl` falls back to the engine default.
    pub async fn create(&self, ttl: Option<u64>) -> (TaskState, CancellationToken) {
        let task_id = uuid::Uuid::new_v4().to_string();
        let state = TaskState::new(
            task_id.clone(),
            ttl.or(self.default_ttl),
            Some(self.poll_interval),
        );
        let token = CancellationToken::new();
        let (outcome, _) = watch::channel(None);
        let entry = TaskEntry {
            state: state.clone(),
            token: token.clone(),
            outcome,
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
        };
        self.tasks.lock().await.insert(task_id.clone(), entry);
        tracing::debug!("Task {task_id} created");
        (state, token)
    }

    /// Drive `work` to completion in the background and cache its outcome.
    pub fn spawn<F>(
        self: &Arc<Self>,
        task_id: String,
        token: CancellationToken,
        work: F,
    ) -> JoinHandle<()>
    where
        F: Future<Output = McpResult<Vec<ToolContent>>> + Send + 'static,
    {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                result = work => match result {
                    Ok(content) => Ok(to_wire(&ToolCallResult::for_task(content, &task_id))),
                    Err(e) => {
                        tracing::debug!("Task {task_id} failed: {e}");
                        Err(e.to_error_object())
                    }
                },
                _ = token.cancelled() => Err(cancelled_outcome(&task_id)),
            };

            if let Some(ttl) = engine.finish(&task_id, outcome).await {
                engine.schedule_reclaim(task_id, ttl);
            }
        })
    }

    /// Move the task to its terminal status for `outcome` and cache the response.
    ///
    /// Returns the task's retention, or `None` when it is kept forever or already gone.
    ///
    /// # Panics
    ///
    /// If the task is still non-terminal afterwards.
    pub async fn finish(&self, task_id: &str, outcome: TaskOutcome) -> Option<Option<u64>> {
        let mut tasks = self.tasks.lock().await;
        let entry = tasks.get_mut(task_id)?;

        if !entry.state.status.is_terminal() {
            let status = if outcome.is_ok() {
                TaskStatus::Completed
            } else {
                TaskStatus::Failed
            };
            if let Err(e) = transition(&mut entry.state, status, None) {
                tracing::error!("{e}");
            }
        }

        assert!(
            entry.state.status.is_terminal(),
            "task '{task_id}' finished in non-terminal status '{}'",
            entry.state.status
        );

        entry.outcome.send_if_modified(|cached| {
            if cached.is_some() {
                return false;
            }
            *cached = Some(outcome);
            true
        });

        Some(entry.state.ttl)
    }

    fn schedule_reclaim(self: &Arc<Self>, task_id: String, ttl: Option<u64>) {
        let Some(ttl) = ttl else { return };
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ttl)).await;
            if engine.tasks.lock().await.remove(&task_id).is_some() {
                tracing::debug!("Task {task_id} reclaimed");
            }
        });
    }

    pub async fn get(&self, task_id: &str) -> McpResult<TaskState> {
        self.tasks
            .lock()
            .await
            .get(task_id)
            .map(|entry| entry.state.clone())
            .ok_or_else(|| McpError::TaskNotFound(task_id.to_string()))
    }

    /// All tasks, oldest first.
    pub async fn list(&self) -> Vec<TaskState> {
        let tasks = self.tasks.lock().await;
        let mut entries: Vec<&TaskEntry> = tasks.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.state.clone()).collect()
    }

    /// Apply a non-terminal status change requested by the running tool.
    pub async fn update(
        &self,
        task_id: &str,
        status: TaskStatus,
        message: String,
    ) -> McpResult<TaskState> {
        let mut tasks = self.tasks.lock().await;
        let entry = tasks
            .get_mut(task_id)
            .ok_or_else(|| McpError::TaskNotFound(task_id.to_string()))?;
        transition(&mut entry.state, status, Some(message))?;
        Ok(entry.state.clone())
    }

    /// Cancel a running task. Unknown and terminal tasks are rejected.
    pub async fn cancel(&self, task_id: &str) -> McpResult<TaskState> {
        let mut tasks = self.tasks.lock().await;
        let entry = tasks
            .get_mut(task_id)
            .ok_or_else(|| McpError::TaskNotFound(task_id.to_string()))?;

        if entry.state.status.is_terminal() {
            return Err(McpError::TaskAlreadyTerminal {
                task_id: task_id.to_string(),
                status: entry.state.status,
            });
        }

        let message = format!("Task '{task_id}' cancelled by client");
        transition(&mut entry.state, TaskStatus::Cancelled, Some(message))?;
        entry.token.cancel();
        entry.outcome.send_if_modified(|cached| {
            if cached.is_some() {
                return false;
            }
            *cached = Some(Err(cancelled_outcome(task_id)));
            true
        });

        tracing::info!("Task {task_id} cancelled");
        Ok(entry.state.clone())
    }

    /// The task's final response, waiting for the execution if it is still running.
    pub async fn result(&self, task_id: &str) -> McpResult<TaskOutcome> {
        let mut rx = {
            let tasks = self.tasks.lock().await;
            let entry = tasks
                .get(task_id)
                .ok_or_else(|| McpError::TaskNotFound(task_id.to_string()))?;
            entry.outcome.subscribe()
        };

        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| McpError::TaskNotFound(task_id.to_string()))?;
        outcome
            .clone()
            .ok_or_else(|| McpError::InternalError(format!("Task '{task_id}' has no result")))
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }
}

fn cancelled_outcome(task_id: &str) -> JsonRpcErrorObject {
    JsonRpcErrorObject {
        code: mcp_error_codes::REQUEST_CANCELLED,
        message: format!("Task '{task_id}' cancelled by client"),
        data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easymcp::error::error_codes;

    fn engine(ttl: Option<u64>) -> Arc<TaskEngine> {
        Arc::new(TaskEngine::new(ttl, 5_000))
    }

    #[tokio::test]
    async fn test_create_is_working() {
        let engine = engine(Some(15_000));
        let (state, token) = engine.create(None).await;
        assert_eq!(state.status, TaskStatus::Working);
        assert_eq!(state.ttl, Some(15_000));
        assert_eq!(state.poll_interval, Some(5_000));
        assert!(!token.is_cancelled());
        assert_eq!(engine.get(&state.task_id).await.unwrap(), state);

        let (custom, _) = engine.create(Some(1_000)).await;
        assert_eq!(custom.ttl, Some(1_000));
    }

    #[tokio::test]
    async fn test_success_is_cached() {
        let engine = engine(None);
        let (state, token) = engine.create(None).await;
        let id = state.task_id.clone();

        engine
            .spawn(id.clone(), token, async { Ok(vec![ToolContent::text("done")]) })
            .await
            .unwrap();

        assert_eq!(engine.get(&id).await.unwrap().status, TaskStatus::Completed);
        let first = engine.result(&id).await.unwrap().unwrap();
        let second = engine.result(&id).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first["content"][0]["text"], "done");
        assert_eq!(
            first["_meta"]["io.modelcontextprotocol/related-task"]["taskId"],
            id.as_str()
        );
    }

    #[tokio::test]
    async fn test_failure_is_cached_as_error() {
        let engine = engine(None);
        let (state, token) = engine.create(None).await;
        let id = state.task_id.clone();

        engine
            .spawn(id.clone(), token, async {
                Err(McpError::InvalidParams("bad input".into()))
            })
            .await
            .unwrap();

        assert_eq!(engine.get(&id).await.unwrap().status, TaskStatus::Failed);
        let err = engine.result(&id).await.unwrap().unwrap_err();
        assert_eq!(err.code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_result_waits_for_execution() {
        let engine = engine(None);
        let (state, token) = engine.create(None).await;
        let id = state.task_id.clone();
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        engine.spawn(id.clone(), token, async move {
            let _ = gate.await;
            Ok(vec![ToolContent::text("late")])
        });

        let waiter = {
            let engine = Arc::clone(&engine);
            let id = id.clone();
            tokio::spawn(async move { engine.result(&id).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(engine.get(&id).await.unwrap().status, TaskStatus::Working);
        release.send(()).unwrap();

        let outcome = waiter.await.unwrap().unwrap().unwrap();
        assert_eq!(outcome["content"][0]["text"], "late");
    }

    #[tokio::test]
    async fn test_cancel_wins_over_late_completion() {
        let engine = engine(None);
        let (state, token) = engine.create(None).await;
        let id = state.task_id.clone();

        let handle = engine.spawn(id.clone(), token.clone(), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![])
        });

        let cancelled = engine.cancel(&id).await.unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);
        assert_eq!(
            cancelled.status_message.as_deref(),
            Some(format!("Task '{id}' cancelled by client").as_str())
        );
        assert!(token.is_cancelled());
        handle.await.unwrap();

        assert_eq!(engine.get(&id).await.unwrap().status, TaskStatus::Cancelled);
        let err = engine.result(&id).await.unwrap().unwrap_err();
        assert_eq!(err.code, mcp_error_codes::REQUEST_CANCELLED);
    }

    #[tokio::test]
    async fn test_cancel_rejects_terminal_and_unknown() {
        let engine = engine(None);
        let (state, token) = engine.create(None).await;
        let id = state.task_id.clone();
        engine
            .spawn(id.clone(), token, async { Ok(vec![]) })
            .await
            .unwrap();

        let err = engine.cancel(&id).await.unwrap_err();
        assert!(matches!(
            err,
            McpError::TaskAlreadyTerminal {
                status: TaskStatus::Completed,
                ..
            }
        ));
        assert_eq!(err.code(), error_codes::INVALID_PARAMS);

        let err = engine.cancel("missing").await.unwrap_err();
        assert!(matches!(err, McpError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_second_cancel_fails_cleanly() {
        let engine = engine(None);
        let (state, _token) = engine.create(None).await;
        engine.cancel(&state.task_id).await.unwrap();
        let err = engine.cancel(&state.task_id).await.unwrap_err();
        assert!(matches!(err, McpError::TaskAlreadyTerminal { .. }));
    }

    #[tokio::test]
    async fn test_update_rejects_terminal() {
        let engine = engine(None);
        let (state, _token) = engine.create(None).await;
        let id = state.task_id.clone();

        let updated = engine
            .update(&id, TaskStatus::InputRequired, "need input".into())
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InputRequired);

        engine.cancel(&id).await.unwrap();
        let err = engine
            .update(&id, TaskStatus::Working, "again".into())
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::InvalidTaskTransition { .. }));
    }

    #[tokio::test]
    async fn test_terminal_task_reclaimed_after_ttl() {
        let engine = engine(Some(30));
        let (state, token) = engine.create(None).await;
        let id = state.task_id.clone();
        engine
            .spawn(id.clone(), token, async { Ok(vec![]) })
            .await
            .unwrap();

        assert!(engine.get(&id).await.is_ok());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(matches!(
            engine.get(&id).await,
            Err(McpError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_oldest_first() {
        let engine = engine(None);
        let (a, _) = engine.create(None).await;
        let (b, _) = engine.create(None).await;
        let (c, _) = engine.create(None).await;
        let ids: Vec<String> = engine.list().await.into_iter().map(|t| t.task_id).collect();
        assert_eq!(ids, vec![a.task_id, b.task_id, c.task_id]);
    }
}
