//! Protocol version negotiation and capability gates.

use easymcp::{McpError, McpResult, ProtocolVersion, ServerCapabilities};

/// Accept the client's requested revision if this engine speaks it.
pub fn negotiate_version(requested: &str) -> McpResult<ProtocolVersion> {
    ProtocolVersion::parse(requested).ok_or_else(|| McpError::UnsupportedProtocolVersion {
        requested: requested.to_string(),
    })
}

/// Fail when `current` predates `required`.
pub fn require_at_least_version(
    current: ProtocolVersion,
    required: ProtocolVersion,
    message: &str,
) -> McpResult<()> {
    if current < required {
        return Err(McpError::ProtocolVersionTooOld {
            message: message.to_string(),
            current,
            required,
        });
    }
    Ok(())
}

/// `completion/complete` is unconditional on 2024-11-05. Later revisions need
/// the completions capability.
pub fn check_completion(
    current: ProtocolVersion,
    capabilities: &ServerCapabilities,
) -> McpResult<()> {
    if current == ProtocolVersion::V2024_11_05 {
        return Ok(());
    }
    require_at_least_version(
        current,
        ProtocolVersion::V2025_03_26,
        "The protocol version is too old to support completions requests.",
    )?;
    if !capabilities.completions_enabled() {
        return Err(McpError::MethodNotFound(
            "'supportsCompletion' server option is not enabled".to_string(),
        ));
    }
    Ok(())
}

/// Which `*/list_changed` notification is being emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Prompts,
    Tools,
    Resources,
}

impl ListKind {
    fn option_name(self) -> &'static str {
        match self {
            ListKind::Prompts => "sendPromptsListChangedNotification",
            ListKind::Tools => "sendToolsListChangedNotification",
            ListKind::Resources => "sendResourcesListChangedNotification",
        }
    }
}

pub fn check_list_changed(capabilities: &ServerCapabilities, kind: ListKind) -> McpResult<()> {
    let enabled = match kind {
        ListKind::Prompts => capabilities.prompts_list_changed(),
        ListKind::Tools => capabilities.tools_list_changed(),
        ListKind::Resources => capabilities.resources_list_changed(),
    };
    if !enabled {
        return Err(disabled_option(kind.option_name()));
    }
    Ok(())
}

pub fn check_subscribe(capabilities: &ServerCapabilities) -> McpResult<()> {
    if !capabilities.resources_subscribe() {
        return Err(disabled_option(
            "allowClientSubscribeToIndividualResourceUpdate",
        ));
    }
    Ok(())
}

/// A resource update is only sent for URIs the client subscribed to.
pub fn check_resource_updated(
    capabilities: &ServerCapabilities,
    subscribed: bool,
    uri: &str,
) -> McpResult<()> {
    check_subscribe(capabilities)?;
    if !subscribed {
        return Err(McpError::ResourceNotSubscribed(uri.to_string()));
    }
    Ok(())
}

pub fn check_logging(capabilities: &ServerCapabilities) -> McpResult<()> {
    if !capabilities.logging_enabled() {
        return Err(disabled_option("sendLogs"));
    }
    Ok(())
}

pub fn check_sampling(capabilities: &ServerCapabilities) -> McpResult<()> {
    if !capabilities.sampling_enabled() {
        return Err(McpError::CapabilityDisabled(
            "Sampling capability is not enabled".to_string(),
        ));
    }
    Ok(())
}

pub fn check_elicitation(capabilities: &ServerCapabilities) -> McpResult<()> {
    if !capabilities.elicitation_enabled() {
        return Err(McpError::CapabilityDisabled(
            "Elicitation capability is not enabled".to_string(),
        ));
    }
    Ok(())
}

pub fn check_tasks(capabilities: &ServerCapabilities) -> McpResult<()> {
    if capabilities.tasks.is_none() {
        return Err(disabled_option("supportsTasks"));
    }
    Ok(())
}

fn disabled_option(option: &str) -> McpError {
    McpError::CapabilityDisabled(format!("'{option}' server option is not enabled"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use easymcp::capabilities::{CompletionsCapability, PromptsCapability, ResourcesCapability};
    use easymcp::error_codes;

    #[test]
    fn test_negotiate_known_versions() {
        for version in ProtocolVersion::SUPPORTED {
            assert_eq!(negotiate_version(version.as_str()).unwrap(), version);
        }
    }

    #[test]
    fn test_negotiate_unknown_version() {
        let err = negotiate_version("1999-01-01").unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_PARAMS);
        let data = err.data().unwrap();
        assert_eq!(data["requested"], "1999-01-01");
        assert_eq!(data["supported"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_require_at_least_version() {
        assert!(require_at_least_version(
            ProtocolVersion::V2025_06_18,
            ProtocolVersion::V2025_03_26,
            "too old"
        )
        .is_ok());

        let err = require_at_least_version(
            ProtocolVersion::V2024_11_05,
            ProtocolVersion::V2025_03_26,
            "too old",
        )
        .unwrap_err();
        assert_eq!(err.code(), error_codes::METHOD_NOT_FOUND);
        assert_eq!(err.to_string(), "too old");
    }

    #[test]
    fn test_completion_gate() {
        let without = ServerCapabilities::default();
        let with = ServerCapabilities {
            completions: Some(CompletionsCapability::default()),
            ..Default::default()
        };

        assert!(check_completion(ProtocolVersion::V2024_11_05, &without).is_ok());
        assert!(check_completion(ProtocolVersion::V2025_06_18, &with).is_ok());
        let err = check_completion(ProtocolVersion::V2025_06_18, &without).unwrap_err();
        assert_eq!(err.code(), error_codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_list_changed_gate() {
        let caps = ServerCapabilities {
            prompts: Some(PromptsCapability { list_changed: true }),
            ..Default::default()
        };
        assert!(check_list_changed(&caps, ListKind::Prompts).is_ok());
        let err = check_list_changed(&caps, ListKind::Tools).unwrap_err();
        assert_eq!(err.code(), error_codes::INTERNAL_ERROR);
        assert!(err.to_string().contains("sendToolsListChangedNotification"));
    }

    #[test]
    fn test_resource_updated_gate() {
        let caps = ServerCapabilities {
            resources: Some(ResourcesCapability {
                subscribe: true,
                list_changed: false,
            }),
            ..Default::default()
        };
        assert!(check_resource_updated(&caps, true, "file:///a").is_ok());
        let err = check_resource_updated(&caps, false, "file:///a").unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_PARAMS);

        let err = check_resource_updated(&ServerCapabilities::default(), true, "file:///a")
            .unwrap_err();
        assert_eq!(err.code(), error_codes::INTERNAL_ERROR);
    }

    #[test]
    fn test_sampling_and_elicitation_gates() {
        let caps = ServerCapabilities::default();
        assert_eq!(
            check_sampling(&caps).unwrap_err().to_string(),
            "Sampling capability is not enabled"
        );
        assert_eq!(
            check_elicitation(&caps).unwrap_err().to_string(),
            "Elicitation capability is not enabled"
        );
    }
}
