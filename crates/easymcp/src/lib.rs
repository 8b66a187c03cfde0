//! EasyMCP — protocol model for a Model Context Protocol server engine.
//!
//! JSON-RPC envelopes, message classification, capability and version records,
//! the task state machine, and cursor pagination. The session engine itself
//! lives in `easymcp-server`.

pub mod capabilities;
pub mod classify;
pub mod error;
pub mod message;
pub mod notification;
pub mod pagination;
pub mod request;
pub mod response;
pub mod slug;
pub mod task;

pub use capabilities::{
    ClientCapabilities, Implementation, InitializeParams, InitializeResult, ProtocolVersion,
    ServerCapabilities,
};
pub use classify::{classify, ClientNotification, ClientRequest, Envelope, Method};
pub use error::{error_codes, mcp_error_codes, McpError, McpResult};
pub use message::{
    to_wire, JsonRpcError, JsonRpcErrorObject, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId, JSONRPC_VERSION,
};
pub use notification::{LogLevel, ProgressToken};
pub use pagination::{cursor_token, paginate, Page, PAGE_SIZE};
pub use task::{TaskState, TaskStatus};
