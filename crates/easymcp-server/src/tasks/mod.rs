//! Task-augmented tool execution.

pub mod engine;

pub use engine::{TaskEngine, TaskOutcome};
