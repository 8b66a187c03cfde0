//! Prompt templates bundled with the demo provider.

pub mod code_review;
pub mod explain;
pub mod registry;

pub use registry::PromptRegistry;
