//! Narrow handles a provider gets while serving one request.
//!
//! A [`RequestContext`] can report progress, log to the client, emit the
//! capability-gated notifications, and issue server-to-client requests. It
//! never touches the job registry or the task engine directly.

use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use easymcp::notification::{self, ProgressParams};
use easymcp::request::{methods, CreateMessageParams, ElicitParams};
use easymcp::response::{CreateMessageResult, ElicitResult, Root};
use easymcp::{
    to_wire, JsonRpcRequest, LogLevel, McpError, McpResult, ProgressToken, ProtocolVersion,
    RequestId, ServerCapabilities, TaskStatus,
};

use crate::config::ServerConfig;
use crate::session::correlation::Reply;
use crate::session::{CorrelationRegistry, SessionState, Settle};
use crate::tasks::TaskEngine;
use crate::transport::Transport;

use super::negotiation::{self, ListKind};

/// Engine state shared by every context of a session.
#[derive(Clone)]
pub(crate) struct Outbound {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) session: Arc<Mutex<SessionState>>,
    pub(crate) correlations: Arc<CorrelationRegistry>,
    pub(crate) config: Arc<ServerConfig>,
}

impl Outbound {
    pub(crate) async fn send<T: Serialize>(&self, message: &T) -> McpResult<()> {
        self.transport.send(to_wire(message)).await
    }

    pub(crate) async fn capabilities(&self) -> ServerCapabilities {
        self.session.lock().await.capabilities().clone()
    }
}

#[derive(Clone)]
pub struct RequestContext {
    outbound: Outbound,
    request_id: Option<RequestId>,
    progress_token: Option<ProgressToken>,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub(crate) fn new(
        outbound: Outbound,
        request_id: Option<RequestId>,
        meta: Option<&Value>,
        cancellation: CancellationToken,
    ) -> Self {
        let progress_token = meta
            .and_then(|m| m.get("progressToken"))
            .and_then(|t| serde_json::from_value(t.clone()).ok());
        Self {
            outbound,
            request_id,
            progress_token,
            cancellation,
        }
    }

    /// The same request, observed under another cancellation signal.
    pub(crate) fn with_cancellation(&self, cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            ..self.clone()
        }
    }

    /// Id of the client request being served. `None` inside lifecycle hooks.
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub async fn protocol_version(&self) -> ProtocolVersion {
        self.outbound.session.lock().await.protocol_version()
    }

    pub fn progress(&self) -> Progress<'_> {
        Progress { ctx: self }
    }

    pub fn log(&self) -> Logger<'_> {
        Logger {
            ctx: self,
            logger: None,
        }
    }

    pub fn notify(&self) -> Notifier<'_> {
        Notifier { ctx: self }
    }

    pub fn client(&self) -> ClientRequests<'_> {
        ClientRequests { ctx: self }
    }
}

/// Emits `notifications/progress` for the request's progress token.
pub struct Progress<'a> {
    ctx: &'a RequestContext,
}

impl Progress<'_> {
    /// Report `value` out of `total` (1 when omitted).
    ///
    /// Without a progress token from the client this only validates.
    pub async fn report(
        &self,
        value: f64,
        total: Option<f64>,
        message: Option<&str>,
    ) -> McpResult<()> {
        let total = total.unwrap_or(1.0);
        if !(0.0..=total).contains(&value) {
            return Err(McpError::InvalidParams(format!(
                "Progress value must be between 0 and {total}"
            )));
        }
        let Some(token) = &self.ctx.progress_token else {
            return Ok(());
        };
        let params = ProgressParams {
            progress_token: token.clone(),
            progress: value,
            total: Some(total),
            message: message.map(str::to_string),
        };
        self.ctx
            .outbound
            .send(&notification::progress(params))
            .await
    }
}

/// Client-facing logging through `notifications/message`.
pub struct Logger<'a> {
    ctx: &'a RequestContext,
    logger: Option<String>,
}

impl Logger<'_> {
    /// Tag every line with a logger name.
    pub fn named(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    /// Send one line if the client's threshold lets `level` through.
    pub async fn log(&self, level: LogLevel, message: &str, details: Option<Value>) -> McpResult<()> {
        if !self.ctx.outbound.session.lock().await.should_log(level) {
            return Ok(());
        }

        let mut data = json!({ "message": message });
        if let Some(details) = details {
            data["details"] = details;
        }
        let notification = notification::log_message(level, self.logger.clone(), data);
        self.ctx.outbound.send(&notification).await?;

        if let Some(path) = &self.ctx.outbound.config.server.logs_file_path {
            append_log_line(path, level, message).await?;
        }
        Ok(())
    }

    pub async fn debug(&self, message: &str) -> McpResult<()> {
        self.log(LogLevel::Debug, message, None).await
    }

    pub async fn info(&self, message: &str) -> McpResult<()> {
        self.log(LogLevel::Info, message, None).await
    }

    pub async fn notice(&self, message: &str) -> McpResult<()> {
        self.log(LogLevel::Notice, message, None).await
    }

    pub async fn warning(&self, message: &str) -> McpResult<()> {
        self.log(LogLevel::Warning, message, None).await
    }

    pub async fn error(&self, message: &str) -> McpResult<()> {
        self.log(LogLevel::Error, message, None).await
    }

    pub async fn critical(&self, message: &str) -> McpResult<()> {
        self.log(LogLevel::Critical, message, None).await
    }

    pub async fn alert(&self, message: &str) -> McpResult<()> {
        self.log(LogLevel::Alert, message, None).await
    }

    pub async fn emergency(&self, message: &str) -> McpResult<()> {
        self.log(LogLevel::Emergency, message, None).await
    }
}

async fn append_log_line(path: &Path, level: LogLevel, message: &str) -> McpResult<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    let line = format!("{:<10} {}\n", level.as_str(), message);
    file.write_all(line.as_bytes()).await?;
    Ok(())
}

/// Server-to-client notifications, each behind its capability gate.
pub struct Notifier<'a> {
    ctx: &'a RequestContext,
}

impl Notifier<'_> {
    pub async fn prompts_list_changed(&self) -> McpResult<()> {
        self.list_changed(ListKind::Prompts).await
    }

    pub async fn tools_list_changed(&self) -> McpResult<()> {
        self.list_changed(ListKind::Tools).await
    }

    pub async fn resources_list_changed(&self) -> McpResult<()> {
        self.list_changed(ListKind::Resources).await
    }

    async fn list_changed(&self, kind: ListKind) -> McpResult<()> {
        let outbound = &self.ctx.outbound;
        negotiation::check_list_changed(&outbound.capabilities().await, kind)?;
        let notification = match kind {
            ListKind::Prompts => notification::prompts_list_changed(),
            ListKind::Tools => notification::tools_list_changed(),
            ListKind::Resources => notification::resources_list_changed(),
        };
        outbound.send(&notification).await
    }

    /// Tell the client a subscribed resource changed.
    pub async fn resource_updated(&self, uri: &str) -> McpResult<()> {
        let outbound = &self.ctx.outbound;
        {
            let session = outbound.session.lock().await;
            negotiation::check_resource_updated(
                session.capabilities(),
                session.is_subscribed(uri),
                uri,
            )?;
        }
        outbound.send(&notification::resource_updated(uri)).await
    }

    pub async fn elicitation_complete(&self, elicitation_id: &str) -> McpResult<()> {
        let outbound = &self.ctx.outbound;
        negotiation::check_elicitation(&outbound.capabilities().await)?;
        outbound
            .send(&notification::elicitation_complete(elicitation_id))
            .await
    }
}

/// Requests the server sends to the client.
///
/// Each waits for the matching reply under its own attempt timeout and gives
/// up early when the serving request is cancelled.
pub struct ClientRequests<'a> {
    ctx: &'a RequestContext,
}

impl ClientRequests<'_> {
    /// `sampling/createMessage`.
    pub async fn create_message(&self, params: CreateMessageParams) -> McpResult<CreateMessageResult> {
        let outbound = &self.ctx.outbound;
        negotiation::check_sampling(&outbound.capabilities().await)?;
        let params = serde_json::to_value(params)?;
        self.request(
            methods::SAMPLING_CREATE_MESSAGE,
            Some(params),
            Settle::Completion,
            outbound.config.completion_attempt_timeout(),
        )
        .await
    }

    /// `roots/list`.
    pub async fn list_roots(&self) -> McpResult<Vec<Root>> {
        self.request(
            methods::ROOTS_LIST,
            None,
            Settle::Roots,
            self.ctx.outbound.config.completion_attempt_timeout(),
        )
        .await
    }

    /// `elicitation/create`.
    pub async fn elicit(&self, message: &str, requested_schema: Value) -> McpResult<ElicitResult> {
        let outbound = &self.ctx.outbound;
        negotiation::check_elicitation(&outbound.capabilities().await)?;
        let params = serde_json::to_value(ElicitParams {
            message: message.to_string(),
            requested_schema,
        })?;
        self.request(
            methods::ELICITATION_CREATE,
            Some(params),
            Settle::Elicitation,
            outbound.config.elicitation_attempt_timeout(),
        )
        .await
    }

    async fn request<T>(
        &self,
        method: &str,
        params: Option<Value>,
        wrap: fn(Reply<T>) -> Settle,
        timeout: Duration,
    ) -> McpResult<T> {
        let outbound = &self.ctx.outbound;
        let id = outbound.session.lock().await.next_request_id();
        let rx = outbound.correlations.open(id.clone(), wrap).await;

        let request = JsonRpcRequest::new(id.clone(), method, params);
        if let Err(e) = outbound.send(&request).await {
            outbound.correlations.discard(&id).await;
            return Err(e);
        }
        tracing::debug!("Sent {method} as request {id}");

        outbound
            .correlations
            .wait(&id, rx, timeout, &self.ctx.cancellation)
            .await
    }
}

#[derive(Clone)]
struct TaskHandle {
    task_id: String,
    engine: Arc<TaskEngine>,
}

/// Context for `tools/call`. Dereferences to the [`RequestContext`] and adds
/// task status updates when the call runs as a task.
#[derive(Clone)]
pub struct ToolContext {
    inner: RequestContext,
    task: Option<TaskHandle>,
}

impl ToolContext {
    pub(crate) fn inline(inner: RequestContext) -> Self {
        Self { inner, task: None }
    }

    pub(crate) fn for_task(inner: RequestContext, task_id: String, engine: Arc<TaskEngine>) -> Self {
        Self {
            inner,
            task: Some(TaskHandle { task_id, engine }),
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task.as_ref().map(|t| t.task_id.as_str())
    }

    /// Mark the task `working` again. Does nothing outside a task.
    pub async fn continue_task(&self, reason: Option<&str>) -> McpResult<()> {
        self.set_status(TaskStatus::Working, reason.unwrap_or("Task working"))
            .await
    }

    /// Park the task in `input_required`. Does nothing outside a task.
    pub async fn require_input(&self, message: &str) -> McpResult<()> {
        self.set_status(TaskStatus::InputRequired, message).await
    }

    async fn set_status(&self, status: TaskStatus, message: &str) -> McpResult<()> {
        let Some(task) = &self.task else {
            return Ok(());
        };
        let state = task
            .engine
            .update(&task.task_id, status, message.to_string())
            .await?;
        self.inner
            .outbound
            .send(&notification::task_status(&state))
            .await
    }
}

impl Deref for ToolContext {
    type Target = RequestContext;

    fn deref(&self) -> &RequestContext {
        &self.inner
    }
}
