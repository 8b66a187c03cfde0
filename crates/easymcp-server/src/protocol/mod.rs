//! MCP protocol handling: dispatch, negotiation, and provider contexts.

pub mod context;
pub mod handler;
pub mod negotiation;

pub use context::{ClientRequests, Logger, Notifier, Progress, RequestContext, ToolContext};
pub use handler::ProtocolHandler;
