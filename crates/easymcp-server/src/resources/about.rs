//! Resource: easymcp://server/about

use serde_json::json;

use easymcp::response::{ResourceContent, ResourceDefinition};
use easymcp::{McpResult, ProtocolVersion};

pub const URI: &str = "easymcp://server/about";

pub fn definition() -> ResourceDefinition {
    ResourceDefinition {
        uri: URI.to_string(),
        name: "about".to_string(),
        description: Some("Server identity and negotiated protocol".to_string()),
        mime_type: Some("application/json".to_string()),
    }
}

pub fn read(protocol: ProtocolVersion) -> McpResult<Vec<ResourceContent>> {
    let content = json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "protocolVersion": protocol,
        "supportedProtocolVersions": ProtocolVersion::SUPPORTED,
    });

    Ok(vec![ResourceContent::text(
        URI,
        "application/json",
        serde_json::to_string_pretty(&content)?,
    )])
}
