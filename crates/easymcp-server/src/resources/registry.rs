//! Resource registration and dispatch.

use easymcp::response::{ResourceContent, ResourceDefinition};
use easymcp::{McpResult, ProtocolVersion};

use crate::tools::ToolRegistry;

use super::{about, catalog};

pub struct ResourceRegistry;

impl ResourceRegistry {
    pub fn list_resources() -> Vec<ResourceDefinition> {
        vec![about::definition(), catalog::definition()]
    }

    /// Contents for `uri`, or `None` if no resource has that address.
    pub fn read(uri: &str, protocol: ProtocolVersion) -> McpResult<Option<Vec<ResourceContent>>> {
        match uri {
            about::URI => about::read(protocol).map(Some),
            catalog::URI => catalog::read(&ToolRegistry::list_tools()).map(Some),
            _ => Ok(None),
        }
    }
}
