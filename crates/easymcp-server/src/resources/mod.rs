//! Resources bundled with the demo provider.

pub mod about;
pub mod catalog;
pub mod registry;

pub use registry::ResourceRegistry;
