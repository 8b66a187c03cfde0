//! Message classification.
//!
//! Turns a decoded JSON value into an [`Envelope`] and, for requests and
//! notifications, into the closed [`ClientRequest`] / [`ClientNotification`]
//! unions with typed params. Nothing here has side effects.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::capabilities::InitializeParams;
use crate::error::{McpError, McpResult};
use crate::message::{
    JsonRpcErrorObject, JsonRpcNotification, JsonRpcRequest, RequestId, JSONRPC_VERSION,
};
use crate::request::{
    CancelledParams, CompleteParams, ListParams, PromptGetParams, ResourceReadParams,
    ResourceSubscribeParams, SetLevelParams, TaskIdParams, ToolCallParams,
};

/// Every method the engine understands from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    Initialized,
    Cancelled,
    Ping,
    PromptsList,
    PromptsGet,
    ToolsList,
    ToolsCall,
    TasksList,
    TasksGet,
    TasksCancel,
    TasksResult,
    CompletionComplete,
    ResourcesList,
    ResourcesRead,
    ResourcesSubscribe,
    LoggingSetLevel,
    RootsListChanged,
}

impl Method {
    pub fn parse(method: &str) -> Option<Self> {
        let parsed = match method {
            "initialize" => Method::Initialize,
            "notifications/initialized" | "initialized" => Method::Initialized,
            "notifications/cancelled" => Method::Cancelled,
            "ping" => Method::Ping,
            "prompts/list" => Method::PromptsList,
            "prompts/get" => Method::PromptsGet,
            "tools/list" => Method::ToolsList,
            "tools/call" => Method::ToolsCall,
            "tasks/list" => Method::TasksList,
            "tasks/get" => Method::TasksGet,
            "tasks/cancel" => Method::TasksCancel,
            "tasks/result" => Method::TasksResult,
            "completion/complete" => Method::CompletionComplete,
            "resources/list" => Method::ResourcesList,
            "resources/read" => Method::ResourcesRead,
            "resources/subscribe" => Method::ResourcesSubscribe,
            "logging/setLevel" => Method::LoggingSetLevel,
            "notifications/roots/list_changed" => Method::RootsListChanged,
            _ => return None,
        };
        Some(parsed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Initialize => "initialize",
            Method::Initialized => "notifications/initialized",
            Method::Cancelled => "notifications/cancelled",
            Method::Ping => "ping",
            Method::PromptsList => "prompts/list",
            Method::PromptsGet => "prompts/get",
            Method::ToolsList => "tools/list",
            Method::ToolsCall => "tools/call",
            Method::TasksList => "tasks/list",
            Method::TasksGet => "tasks/get",
            Method::TasksCancel => "tasks/cancel",
            Method::TasksResult => "tasks/result",
            Method::CompletionComplete => "completion/complete",
            Method::ResourcesList => "resources/list",
            Method::ResourcesRead => "resources/read",
            Method::ResourcesSubscribe => "resources/subscribe",
            Method::LoggingSetLevel => "logging/setLevel",
            Method::RootsListChanged => "notifications/roots/list_changed",
        }
    }

    pub fn is_notification(self) -> bool {
        matches!(
            self,
            Method::Initialized | Method::Cancelled | Method::RootsListChanged
        )
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The shape of an inbound message.
#[derive(Debug, Clone)]
pub enum Envelope {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    /// A client reply to a server-initiated request.
    Result { id: RequestId, result: Value },
    /// A client error reply to a server-initiated request.
    ErrorResponse {
        id: RequestId,
        error: JsonRpcErrorObject,
    },
}

/// Whether `value` is an object tagged `"jsonrpc": "2.0"`.
pub fn is_envelope(value: &Value) -> bool {
    value.get("jsonrpc").and_then(Value::as_str) == Some(JSONRPC_VERSION)
}

/// The id of a raw message, if it carries a usable one.
pub fn message_id(value: &Value) -> Option<RequestId> {
    value.get("id").and_then(RequestId::from_value)
}

pub fn classify(value: Value) -> McpResult<Envelope> {
    if !is_envelope(&value) {
        return Err(McpError::InvalidRequest(
            "Message is not a JSON-RPC 2.0 envelope".to_string(),
        ));
    }

    let has_id = value.get("id").is_some_and(|id| !id.is_null());
    let method = value.get("method").and_then(Value::as_str).map(String::from);

    match method {
        Some(method) if has_id => {
            let id = message_id(&value).ok_or_else(|| {
                McpError::InvalidRequest("Request id must be a string or integer".to_string())
            })?;
            Ok(Envelope::Request(JsonRpcRequest::new(
                id,
                method,
                value.get("params").cloned(),
            )))
        }
        Some(method) => Ok(Envelope::Notification(JsonRpcNotification::new(
            method,
            value.get("params").cloned(),
        ))),
        None => {
            let id = message_id(&value).ok_or_else(|| {
                McpError::InvalidRequest("Response is missing its id".to_string())
            })?;
            if let Some(result) = value.get("result") {
                Ok(Envelope::Result {
                    id,
                    result: result.clone(),
                })
            } else if let Some(error) = value.get("error") {
                let error: JsonRpcErrorObject = serde_json::from_value(error.clone())
                    .map_err(|e| McpError::InvalidRequest(format!("Malformed error object: {e}")))?;
                Ok(Envelope::ErrorResponse { id, error })
            } else {
                Err(McpError::InvalidRequest(
                    "Message has neither method, result nor error".to_string(),
                ))
            }
        }
    }
}

/// A client request decoded into its typed params.
#[derive(Debug, Clone)]
pub enum ClientRequest {
    Initialize(InitializeParams),
    Ping,
    ListPrompts(ListParams),
    GetPrompt(PromptGetParams),
    ListTools(ListParams),
    CallTool(ToolCallParams),
    ListTasks(ListParams),
    GetTask(TaskIdParams),
    CancelTask(TaskIdParams),
    TaskResult(TaskIdParams),
    Complete(CompleteParams),
    ListResources(ListParams),
    ReadResource(ResourceReadParams),
    Subscribe(ResourceSubscribeParams),
    SetLevel(SetLevelParams),
}

impl ClientRequest {
    pub fn decode(method: &str, params: Option<Value>) -> McpResult<Self> {
        let known = Method::parse(method)
            .filter(|m| !m.is_notification())
            .ok_or_else(|| McpError::MethodNotFound(method.to_string()))?;

        let request = match known {
            Method::Initialize => ClientRequest::Initialize(required(params)?),
            Method::Ping => ClientRequest::Ping,
            Method::PromptsList => ClientRequest::ListPrompts(optional(params)?),
            Method::PromptsGet => ClientRequest::GetPrompt(required(params)?),
            Method::ToolsList => ClientRequest::ListTools(optional(params)?),
            Method::ToolsCall => ClientRequest::CallTool(required(params)?),
            Method::TasksList => ClientRequest::ListTasks(optional(params)?),
            Method::TasksGet => ClientRequest::GetTask(required(params)?),
            Method::TasksCancel => ClientRequest::CancelTask(required(params)?),
            Method::TasksResult => ClientRequest::TaskResult(required(params)?),
            Method::CompletionComplete => ClientRequest::Complete(required(params)?),
            Method::ResourcesList => ClientRequest::ListResources(optional(params)?),
            Method::ResourcesRead => ClientRequest::ReadResource(required(params)?),
            Method::ResourcesSubscribe => ClientRequest::Subscribe(required(params)?),
            Method::LoggingSetLevel => ClientRequest::SetLevel(required(params)?),
            Method::Initialized | Method::Cancelled | Method::RootsListChanged => {
                return Err(McpError::MethodNotFound(method.to_string()))
            }
        };
        Ok(request)
    }

    pub fn method(&self) -> Method {
        match self {
            ClientRequest::Initialize(_) => Method::Initialize,
            ClientRequest::Ping => Method::Ping,
            ClientRequest::ListPrompts(_) => Method::PromptsList,
            ClientRequest::GetPrompt(_) => Method::PromptsGet,
            ClientRequest::ListTools(_) => Method::ToolsList,
            ClientRequest::CallTool(_) => Method::ToolsCall,
            ClientRequest::ListTasks(_) => Method::TasksList,
            ClientRequest::GetTask(_) => Method::TasksGet,
            ClientRequest::CancelTask(_) => Method::TasksCancel,
            ClientRequest::TaskResult(_) => Method::TasksResult,
            ClientRequest::Complete(_) => Method::CompletionComplete,
            ClientRequest::ListResources(_) => Method::ResourcesList,
            ClientRequest::ReadResource(_) => Method::ResourcesRead,
            ClientRequest::Subscribe(_) => Method::ResourcesSubscribe,
            ClientRequest::SetLevel(_) => Method::LoggingSetLevel,
        }
    }
}

/// A client notification the engine reacts to.
#[derive(Debug, Clone)]
pub enum ClientNotification {
    Initialized,
    Cancelled(CancelledParams),
    RootsListChanged,
}

impl ClientNotification {
    /// Decode a notification. Unknown methods yield `Ok(None)`.
    pub fn decode(method: &str, params: Option<Value>) -> McpResult<Option<Self>> {
        let notification = match Method::parse(method) {
            Some(Method::Initialized) => ClientNotification::Initialized,
            Some(Method::Cancelled) => ClientNotification::Cancelled(required(params)?),
            Some(Method::RootsListChanged) => ClientNotification::RootsListChanged,
            _ => return Ok(None),
        };
        Ok(Some(notification))
    }
}

fn required<T: DeserializeOwned>(params: Option<Value>) -> McpResult<T> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .ok_or_else(|| McpError::InvalidParams("Missing params".to_string()))
}

fn optional<T: DeserializeOwned + Default>(params: Option<Value>) -> McpResult<T> {
    Ok(params
        .filter(|p| !p.is_null())
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .unwrap_or_default())
}
