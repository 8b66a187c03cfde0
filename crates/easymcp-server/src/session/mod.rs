//! Per-connection session state and the registries that track in-flight work.

pub mod correlation;
pub mod jobs;
pub mod state;

pub use correlation::{CorrelationKind, CorrelationRegistry, Settle};
pub use jobs::JobRegistry;
pub use state::SessionState;
