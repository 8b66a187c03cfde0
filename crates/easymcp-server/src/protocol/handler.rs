//! Main dispatcher: classifies inbound messages and routes them to handlers.
//!
//! Client requests run concurrently, each under its own cancellation token
//! and the configured deadline. Exactly one reply leaves for every request id.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use easymcp::classify::message_id;
use easymcp::request::{
    CompleteParams, ListParams, PromptGetParams, ResourceReadParams, ResourceSubscribeParams,
    SetLevelParams, TaskIdParams, ToolCallParams,
};
use easymcp::response::{
    empty_result, CompleteResult, CompletionValues, CreateTaskResult, PromptListResult,
    ReadResourceResult, ResourceListResult, TaskListResult, TaskSupport, ToolCallResult,
    ToolDefinition, ToolListResult,
};
use easymcp::slug::same_slug;
use easymcp::{
    classify, paginate, to_wire, ClientNotification, ClientRequest, Envelope, InitializeParams,
    InitializeResult, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, LogLevel, McpError,
    McpResult, RequestId, PAGE_SIZE,
};

use crate::config::ServerConfig;
use crate::provider::ServerProvider;
use crate::session::{CorrelationRegistry, JobRegistry, SessionState};
use crate::tasks::TaskEngine;
use crate::transport::{MessageHandler, Transport};

use super::context::{Outbound, RequestContext, ToolContext};
use super::negotiation;

/// The protocol engine for one client session.
#[derive(Clone)]
pub struct ProtocolHandler {
    provider: Arc<dyn ServerProvider>,
    outbound: Outbound,
    jobs: Arc<JobRegistry>,
    tasks: Arc<TaskEngine>,
    /// Spawned client requests that still owe a reply.
    in_flight: TaskTracker,
}

impl ProtocolHandler {
    pub fn new(
        config: ServerConfig,
        provider: Arc<dyn ServerProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let session = SessionState::new(config.protocol, config.capabilities());
        let tasks = TaskEngine::new(config.task_ttl_ms, config.task_poll_interval_ms);
        Self {
            provider,
            outbound: Outbound {
                transport,
                session: Arc::new(Mutex::new(session)),
                correlations: Arc::new(CorrelationRegistry::new()),
                config: Arc::new(config),
            },
            jobs: Arc::new(JobRegistry::new()),
            tasks: Arc::new(tasks),
            in_flight: TaskTracker::new(),
        }
    }

    /// Serve the transport until the peer goes away, then answer every
    /// request still in flight before closing the transport.
    pub async fn start(&self) -> McpResult<()> {
        tracing::info!("MCP engine starting");
        let handler: Arc<dyn MessageHandler> = Arc::new(self.clone());
        let served = self.outbound.transport.serve(handler).await;

        self.in_flight.close();
        if !self.in_flight.is_empty() {
            tracing::info!("Waiting on {} in-flight requests", self.in_flight.len());
        }
        self.in_flight.wait().await;

        let closed = self.outbound.transport.close().await;
        served?;
        closed
    }

    pub fn session(&self) -> &Arc<Mutex<SessionState>> {
        &self.outbound.session
    }

    pub fn jobs(&self) -> &Arc<JobRegistry> {
        &self.jobs
    }

    pub fn tasks(&self) -> &Arc<TaskEngine> {
        &self.tasks
    }

    pub fn correlations(&self) -> &Arc<CorrelationRegistry> {
        &self.outbound.correlations
    }

    pub async fn handle_message(&self, message: Value) {
        let raw_id = message_id(&message);
        let is_request = message.get("method").is_some();

        match classify(message) {
            Ok(Envelope::Request(request)) => self.handle_request(request).await,
            Ok(Envelope::Notification(notification)) => {
                self.handle_notification(notification).await
            }
            Ok(Envelope::Result { id, result }) => {
                match self.outbound.correlations.resolve(&id, result).await {
                    Ok(kind) => tracing::debug!("Client answered {kind:?} request {id}"),
                    Err(e) => tracing::warn!("{e}"),
                }
            }
            Ok(Envelope::ErrorResponse { id, error }) => {
                tracing::debug!("Client rejected request {id}: {}", error.message);
                if let Err(e) = self.outbound.correlations.reject(&id, error).await {
                    tracing::warn!("{e}");
                }
            }
            Err(e) => {
                tracing::warn!("Dropping malformed message: {e}");
                // Only requests are answered; a malformed response's id is one of ours.
                if let Some(id) = raw_id.filter(|_| is_request) {
                    self.reply(&id, Err(e)).await;
                }
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) {
        let id = request.id.clone();
        let meta = request.meta().cloned();

        let decoded = match ClientRequest::decode(&request.method, request.params) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!("Rejecting {} ({id}): {e}", request.method);
                self.reply(&id, Err(e)).await;
                return;
            }
        };
        tracing::debug!("Dispatching {} ({id})", decoded.method());

        let token = CancellationToken::new();
        let tracked = !matches!(decoded, ClientRequest::Initialize(_));
        if tracked {
            if let Err(e) = self.jobs.register(id.clone(), token.clone()).await {
                tracing::warn!("{e}");
                self.reply(&id, Err(e)).await;
                return;
            }
        }

        let handler = self.clone();
        self.in_flight.spawn(async move {
            let deadline = Instant::now() + handler.outbound.config.timeout();
            let ctx = RequestContext::new(
                handler.outbound.clone(),
                Some(id.clone()),
                meta.as_ref(),
                token.clone(),
            );
            let outcome = if tracked {
                tokio::select! {
                    biased;
                    expired = expire(deadline, &token) => Err(expired),
                    result = handler.dispatch(decoded, ctx) => result,
                }
            } else {
                handler.dispatch(decoded, ctx).await
            };
            let outcome = handler.settle(&id, outcome, deadline, &token).await;
            if tracked {
                handler.jobs.unregister(&id).await;
            }
            handler.reply(&id, outcome).await;
        });
    }

    /// Infrastructure failures are never sent to the client; the request
    /// is held until its deadline or cancellation and answered as timed out.
    async fn settle(
        &self,
        id: &RequestId,
        outcome: McpResult<Value>,
        deadline: Instant,
        token: &CancellationToken,
    ) -> McpResult<Value> {
        match outcome {
            Err(e) if !e.is_protocol_error() => {
                tracing::error!("Request {id} failed: {e}");
                Err(expire(deadline, token).await)
            }
            other => other,
        }
    }

    async fn reply(&self, id: &RequestId, outcome: McpResult<Value>) {
        let message = match outcome {
            Ok(result) => to_wire(&JsonRpcResponse::new(id.clone(), result)),
            Err(e) => to_wire(&e.to_json_rpc_error(id.clone())),
        };
        if let Err(e) = self.outbound.transport.send(message).await {
            tracing::error!("Failed to send reply for {id}: {e}");
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        let decoded = match ClientNotification::decode(&notification.method, notification.params) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => {
                tracing::debug!("Unknown notification: {}", notification.method);
                return;
            }
            Err(e) => {
                tracing::warn!("Malformed {} notification: {e}", notification.method);
                return;
            }
        };

        match decoded {
            ClientNotification::Initialized => {
                self.outbound.session.lock().await.mark_initialized();
                tracing::info!("Client completed initialization");
                let provider = Arc::clone(&self.provider);
                let ctx = self.hook_context();
                tokio::spawn(async move {
                    if let Err(e) = provider.on_connect(&ctx).await {
                        tracing::error!("Connect hook failed: {e}");
                    }
                });
            }
            ClientNotification::Cancelled(params) => {
                let Some(id) = RequestId::from_value(&params.request_id) else {
                    tracing::warn!("Cancellation carried an unusable id: {}", params.request_id);
                    return;
                };
                if self.jobs.cancel(&id).await {
                    tracing::info!(
                        "Cancelled request {id}: {}",
                        params.reason.as_deref().unwrap_or("no reason given")
                    );
                } else {
                    tracing::debug!("No in-flight request {id} to cancel");
                }
            }
            ClientNotification::RootsListChanged => {
                let provider = Arc::clone(&self.provider);
                let ctx = self.hook_context();
                tokio::spawn(async move {
                    if let Err(e) = provider.on_roots_changed(&ctx).await {
                        tracing::error!("Roots-changed hook failed: {e}");
                    }
                });
            }
        }
    }

    fn hook_context(&self) -> RequestContext {
        RequestContext::new(self.outbound.clone(), None, None, CancellationToken::new())
    }

    async fn dispatch(&self, request: ClientRequest, ctx: RequestContext) -> McpResult<Value> {
        match request {
            ClientRequest::Initialize(params) => self.handle_initialize(params, &ctx).await,
            ClientRequest::Ping => Ok(empty_result()),
            ClientRequest::ListPrompts(params) => self.handle_prompts_list(params, &ctx).await,
            ClientRequest::GetPrompt(params) => self.handle_prompts_get(params, &ctx).await,
            ClientRequest::ListTools(params) => self.handle_tools_list(params, &ctx).await,
            ClientRequest::CallTool(params) => self.handle_tools_call(params, ctx).await,
            ClientRequest::ListTasks(params) => self.handle_tasks_list(params).await,
            ClientRequest::GetTask(params) => self.handle_tasks_get(params).await,
            ClientRequest::CancelTask(params) => self.handle_tasks_cancel(params).await,
            ClientRequest::TaskResult(params) => self.handle_tasks_result(params).await,
            ClientRequest::Complete(params) => self.handle_complete(params, &ctx).await,
            ClientRequest::ListResources(params) => self.handle_resources_list(params, &ctx).await,
            ClientRequest::ReadResource(params) => self.handle_resources_read(params, &ctx).await,
            ClientRequest::Subscribe(params) => self.handle_resources_subscribe(params).await,
            ClientRequest::SetLevel(params) => self.handle_set_level(params).await,
        }
    }

    async fn handle_initialize(
        &self,
        params: InitializeParams,
        ctx: &RequestContext,
    ) -> McpResult<Value> {
        let version = negotiation::negotiate_version(&params.protocol_version)?;

        let capabilities = match self.provider.capabilities(ctx).await {
            Some(capabilities) => capabilities,
            None => self.outbound.config.capabilities(),
        };
        let server_info = self.provider.server_info(ctx).await;
        let instructions = self.provider.instructions(ctx).await;

        if let Some(client) = &params.client_info {
            tracing::info!(
                "Initializing {} {} on protocol {version}",
                client.name,
                client.version
            );
        }
        self.outbound.session.lock().await.adopt(
            version,
            capabilities.clone(),
            params.capabilities,
            params.client_info,
        );

        to_result(&InitializeResult {
            protocol_version: version,
            capabilities,
            server_info,
            instructions,
        })
    }

    async fn handle_prompts_list(&self, params: ListParams, ctx: &RequestContext) -> McpResult<Value> {
        let prompts = self.provider.list_prompts(ctx).await?;
        let page = paginate(prompts, params.cursor.as_deref(), |p| p.name.as_str());
        to_result(&PromptListResult {
            prompts: page.items,
            next_cursor: page.next_cursor,
        })
    }

    async fn handle_prompts_get(
        &self,
        params: PromptGetParams,
        ctx: &RequestContext,
    ) -> McpResult<Value> {
        let prompt = self
            .provider
            .list_prompts(ctx)
            .await?
            .into_iter()
            .find(|p| same_slug(&p.name, &params.name))
            .ok_or_else(|| McpError::PromptNotFound(params.name.clone()))?;

        let arguments = params.arguments.unwrap_or_default();
        let result = self.provider.get_prompt(&prompt, arguments, ctx).await?;
        to_result(&result)
    }

    async fn handle_tools_list(&self, params: ListParams, ctx: &RequestContext) -> McpResult<Value> {
        let tools = self.provider.list_tools(ctx).await?;
        let page = paginate(tools, params.cursor.as_deref(), |t| t.name.as_str());
        to_result(&ToolListResult {
            tools: page.items,
            next_cursor: page.next_cursor,
        })
    }

    async fn find_tool(&self, name: &str, ctx: &RequestContext) -> McpResult<ToolDefinition> {
        self.provider
            .list_tools(ctx)
            .await?
            .into_iter()
            .find(|t| same_slug(&t.name, name))
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))
    }

    async fn handle_tools_call(&self, params: ToolCallParams, ctx: RequestContext) -> McpResult<Value> {
        let tool = self.find_tool(&params.name, &ctx).await?;
        let arguments = params.arguments.unwrap_or_else(|| json!({}));

        let Some(task) = params.task else {
            if tool.task_support() == TaskSupport::Required {
                return Err(McpError::TaskRequired(tool.name));
            }
            let content = self
                .provider
                .call_tool(&tool, arguments, &ToolContext::inline(ctx))
                .await?;
            return to_result(&ToolCallResult::success(content));
        };

        negotiation::check_tasks(&self.outbound.capabilities().await)?;
        if tool.task_support() == TaskSupport::Forbidden {
            return Err(McpError::TaskNotSupported(tool.name));
        }

        let (state, token) = self.tasks.create(task.ttl).await;
        tracing::info!("Running {} as task {}", tool.name, state.task_id);

        let tool_ctx = ToolContext::for_task(
            ctx.with_cancellation(token.clone()),
            state.task_id.clone(),
            Arc::clone(&self.tasks),
        );
        let provider = Arc::clone(&self.provider);
        self.tasks.spawn(state.task_id.clone(), token, async move {
            provider.call_tool(&tool, arguments, &tool_ctx).await
        });

        to_result(&CreateTaskResult { task: state })
    }

    async fn handle_tasks_list(&self, params: ListParams) -> McpResult<Value> {
        let tasks = self.tasks.list().await;
        let page = paginate(tasks, params.cursor.as_deref(), |t| t.task_id.as_str());
        to_result(&TaskListResult {
            tasks: page.items,
            next_cursor: page.next_cursor,
        })
    }

    async fn handle_tasks_get(&self, params: TaskIdParams) -> McpResult<Value> {
        to_result(&self.tasks.get(&params.task_id).await?)
    }

    async fn handle_tasks_cancel(&self, params: TaskIdParams) -> McpResult<Value> {
        let state = self.tasks.cancel(&params.task_id).await?;
        tracing::info!("Task {} cancelled by client", params.task_id);
        to_result(&state)
    }

    async fn handle_tasks_result(&self, params: TaskIdParams) -> McpResult<Value> {
        self.tasks.result(&params.task_id).await?.map_err(McpError::Rpc)
    }

    async fn handle_complete(&self, params: CompleteParams, ctx: &RequestContext) -> McpResult<Value> {
        {
            let session = self.outbound.session.lock().await;
            negotiation::check_completion(session.protocol_version(), session.capabilities())?;
        }

        let values = self
            .provider
            .complete(&params.reference, &params.argument, ctx)
            .await?;
        to_result(&CompleteResult {
            completion: cap_completion(values),
        })
    }

    async fn handle_resources_list(
        &self,
        params: ListParams,
        ctx: &RequestContext,
    ) -> McpResult<Value> {
        let resources = self.provider.list_resources(ctx).await?;
        let page = paginate(resources, params.cursor.as_deref(), |r| r.name.as_str());
        to_result(&ResourceListResult {
            resources: page.items,
            next_cursor: page.next_cursor,
        })
    }

    async fn handle_resources_read(
        &self,
        params: ResourceReadParams,
        ctx: &RequestContext,
    ) -> McpResult<Value> {
        let contents = self
            .provider
            .read_resource(&params.uri, ctx)
            .await?
            .ok_or_else(|| McpError::ResourceNotFound(params.uri.clone()))?;
        to_result(&ReadResourceResult { contents })
    }

    async fn handle_resources_subscribe(&self, params: ResourceSubscribeParams) -> McpResult<Value> {
        let mut session = self.outbound.session.lock().await;
        negotiation::check_subscribe(session.capabilities())?;
        tracing::debug!("Client subscribed to {}", params.uri);
        session.subscribe(params.uri);
        Ok(empty_result())
    }

    async fn handle_set_level(&self, params: SetLevelParams) -> McpResult<Value> {
        let level = LogLevel::parse(&params.level)
            .ok_or_else(|| McpError::InvalidParams("Invalid log level".to_string()))?;
        let mut session = self.outbound.session.lock().await;
        negotiation::check_logging(session.capabilities())?;
        session.set_log_level(level);
        drop(session);
        tracing::debug!("Client log level set to {level}");
        Ok(empty_result())
    }
}

#[async_trait]
impl MessageHandler for ProtocolHandler {
    async fn handle_message(&self, message: Value) {
        ProtocolHandler::handle_message(self, message).await
    }
}

/// Sort, cap at one page, and fill in `total`/`hasMore`.
fn cap_completion(values: Option<CompletionValues>) -> CompletionValues {
    let Some(mut completion) = values else {
        return CompletionValues {
            values: Vec::new(),
            total: Some(0),
            has_more: false,
        };
    };

    completion.values.sort();
    let count = completion.values.len();
    let total = completion.total.unwrap_or(count).max(count);
    let has_more = completion.has_more || total > PAGE_SIZE;
    completion.values.truncate(PAGE_SIZE);

    CompletionValues {
        values: completion.values,
        total: Some(total),
        has_more,
    }
}

fn to_result<T: Serialize>(value: &T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::InternalError(e.to_string()))
}

/// Resolves once the request's deadline passes or its token is triggered.
/// A client cancellation is answered the same way as a timeout.
async fn expire(deadline: Instant, token: &CancellationToken) -> McpError {
    tokio::select! {
        _ = tokio::time::sleep_until(deadline) => token.cancel(),
        _ = token.cancelled() => {}
    }
    McpError::RequestTimedOut
}
