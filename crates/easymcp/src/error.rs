//! Error types and JSON-RPC error codes for the MCP engine.

use serde_json::{json, Value};

use crate::capabilities::ProtocolVersion;
use crate::message::{JsonRpcError, JsonRpcErrorObject, RequestId};
use crate::task::TaskStatus;

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP-specific error codes.
pub mod mcp_error_codes {
    pub const REQUEST_CANCELLED: i32 = -32800;
}

/// All errors that can occur while serving an MCP session.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Unsupported protocol version requested")]
    UnsupportedProtocolVersion { requested: String },

    /// The negotiated protocol revision predates the feature being used.
    #[error("{message}")]
    ProtocolVersionTooOld {
        message: String,
        current: ProtocolVersion,
        required: ProtocolVersion,
    },

    /// A server option required for this operation is switched off.
    #[error("{0}")]
    CapabilityDisabled(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Resource '{0}' is not subscribed")]
    ResourceNotSubscribed(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Cannot cancel task: already in terminal status '{status}'.")]
    TaskAlreadyTerminal { task_id: String, status: TaskStatus },

    #[error("Task '{task_id}' cannot move from '{from}' to '{to}'")]
    InvalidTaskTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Tool does not support tasks: {0}")]
    TaskNotSupported(String),

    #[error("Tool requires task-augmented execution: {0}")]
    TaskRequired(String),

    #[error("Request timed out")]
    RequestTimedOut,

    #[error("Request cancelled")]
    RequestCancelled,

    #[error("Duplicate request id: {0}")]
    DuplicateRequestId(RequestId),

    #[error("No request found related with id '{0}'")]
    UnmatchedResponse(RequestId),

    /// An error object received from, or destined for, the peer verbatim.
    #[error("{}", .0.message)]
    Rpc(JsonRpcErrorObject),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) | McpError::DuplicateRequestId(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) | McpError::ProtocolVersionTooOld { .. } => {
                METHOD_NOT_FOUND
            }
            McpError::InvalidParams(_)
            | McpError::UnsupportedProtocolVersion { .. }
            | McpError::ResourceNotFound(_)
            | McpError::ResourceNotSubscribed(_)
            | McpError::ToolNotFound(_)
            | McpError::PromptNotFound(_)
            | McpError::TaskNotFound(_)
            | McpError::TaskAlreadyTerminal { .. }
            | McpError::TaskNotSupported(_)
            | McpError::TaskRequired(_)
            | McpError::UnmatchedResponse(_) => INVALID_PARAMS,
            McpError::InternalError(_)
            | McpError::CapabilityDisabled(_)
            | McpError::InvalidTaskTransition { .. }
            | McpError::RequestTimedOut => INTERNAL_ERROR,
            McpError::RequestCancelled => REQUEST_CANCELLED,
            McpError::Rpc(obj) => obj.code,
            McpError::Transport(_) | McpError::Io(_) => INTERNAL_ERROR,
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    /// Structured data attached to the error envelope, if any.
    pub fn data(&self) -> Option<Value> {
        match self {
            McpError::UnsupportedProtocolVersion { requested } => Some(json!({
                "supported": ProtocolVersion::SUPPORTED
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>(),
                "requested": requested,
            })),
            McpError::ProtocolVersionTooOld {
                current, required, ..
            } => Some(json!({
                "currentProtocolVersion": current,
                "requiredProtocolVersion": required,
            })),
            McpError::ResourceNotFound(uri) => Some(json!({ "uri": uri })),
            McpError::Rpc(obj) => obj.data.clone(),
            _ => None,
        }
    }

    /// Whether this error is meant to reach the client.
    ///
    /// Infrastructure failures are reported to operators only.
    pub fn is_protocol_error(&self) -> bool {
        !matches!(
            self,
            McpError::Transport(_) | McpError::Io(_) | McpError::Json(_)
        )
    }

    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            McpError::Rpc(obj) => obj.clone(),
            _ => JsonRpcErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: self.data(),
            },
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::from_object(id, self.to_error_object())
    }
}

pub type McpResult<T> = Result<T, McpError>;
