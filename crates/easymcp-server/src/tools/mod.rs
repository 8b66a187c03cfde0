//! Tools bundled with the demo provider.

pub mod countdown;
pub mod echo;
pub mod list_roots;
pub mod registry;
pub mod summarize;

pub use registry::ToolRegistry;
