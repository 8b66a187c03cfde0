//! EasyMCP server engine: serves the Model Context Protocol over any transport.
//!
//! Plug an application in through [`ServerProvider`], pick a [`transport`],
//! and drive the session with [`ProtocolHandler::start`].

pub mod config;
pub mod prompts;
pub mod protocol;
pub mod provider;
pub mod resources;
pub mod session;
pub mod tasks;
pub mod tools;
pub mod transport;

pub use config::ServerConfig;
pub use protocol::{ProtocolHandler, RequestContext, ToolContext};
pub use provider::{BuiltinProvider, ServerProvider};
pub use transport::{ChannelTransport, StdioTransport, Transport};
