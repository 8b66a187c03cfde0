//! Configuration loading and resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use easymcp::capabilities::{
    CompletionsCapability, ElicitationCapability, LoggingCapability, PromptsCapability,
    ResourcesCapability, RootsCapability, SamplingCapability, TasksCapability, ToolsCapability,
};
use easymcp::{McpError, McpResult, ProtocolVersion, ServerCapabilities};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "EASYMCP_CONFIG";

/// Environment variable overriding `timeoutMs`.
pub const TIMEOUT_ENV: &str = "EASYMCP_TIMEOUT";

/// Engine configuration. Every field has a default, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Protocol version assumed until `initialize` negotiates one.
    pub protocol: ProtocolVersion,
    /// Deadline for every client request except `initialize`.
    pub timeout_ms: u64,
    /// Deadline for sampling and roots requests sent to the client.
    pub completion_attempt_timeout_ms: u64,
    /// Deadline for elicitation requests sent to the client.
    pub elicitation_attempt_timeout_ms: u64,
    /// Default task retention after it reaches a terminal status. `null` keeps tasks forever.
    pub task_ttl_ms: Option<u64>,
    pub task_poll_interval_ms: u64,
    pub server: ServerOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerOptions {
    pub send_tools_list_changed_notification: bool,
    pub send_prompts_list_changed_notification: bool,
    pub send_resources_list_changed_notification: bool,
    pub allow_client_subscribe_to_individual_resource_update: bool,
    pub send_logs: bool,
    /// Every client log line is also appended here when set.
    pub logs_file_path: Option<PathBuf>,
    pub supports_completion: bool,
    pub supports_elicitation: bool,
    pub supports_tasks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolVersion::default(),
            timeout_ms: 10_000,
            completion_attempt_timeout_ms: 10_000,
            elicitation_attempt_timeout_ms: 10_000,
            task_ttl_ms: Some(15_000),
            task_poll_interval_ms: 5_000,
            server: ServerOptions::default(),
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            send_tools_list_changed_notification: true,
            send_prompts_list_changed_notification: true,
            send_resources_list_changed_notification: true,
            allow_client_subscribe_to_individual_resource_update: true,
            send_logs: true,
            logs_file_path: None,
            supports_completion: false,
            supports_elicitation: false,
            supports_tasks: true,
        }
    }
}

impl ServerConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> McpResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            McpError::InvalidParams(format!("Invalid config file {}: {e}", path.display()))
        })
    }

    /// Resolve the configuration: explicit path, then `EASYMCP_CONFIG`, then defaults.
    /// `EASYMCP_TIMEOUT` is applied last.
    pub fn resolve(explicit: Option<&str>) -> McpResult<Self> {
        let path = explicit
            .map(PathBuf::from)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load(&path)?
            }
            None => Self::default(),
        };

        config.apply_timeout_override(std::env::var(TIMEOUT_ENV).ok().as_deref());
        Ok(config)
    }

    fn apply_timeout_override(&mut self, raw: Option<&str>) {
        let Some(raw) = raw else { return };
        match raw.trim().parse::<u64>() {
            Ok(ms) => self.timeout_ms = ms,
            Err(_) => tracing::warn!("Ignoring {TIMEOUT_ENV}={raw}: not a number of milliseconds"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn completion_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_attempt_timeout_ms)
    }

    pub fn elicitation_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.elicitation_attempt_timeout_ms)
    }

    /// The capability set advertised when the provider does not override it.
    pub fn capabilities(&self) -> ServerCapabilities {
        let opts = &self.server;
        ServerCapabilities {
            experimental: None,
            completions: opts.supports_completion.then(CompletionsCapability::default),
            prompts: Some(PromptsCapability {
                list_changed: opts.send_prompts_list_changed_notification,
            }),
            resources: Some(ResourcesCapability {
                subscribe: opts.allow_client_subscribe_to_individual_resource_update,
                list_changed: opts.send_resources_list_changed_notification,
            }),
            tools: Some(ToolsCapability {
                list_changed: opts.send_tools_list_changed_notification,
            }),
            roots: Some(RootsCapability {
                list_changed: false,
            }),
            sampling: Some(SamplingCapability::default()),
            logging: opts.send_logs.then(LoggingCapability::default),
            elicitation: opts
                .supports_elicitation
                .then(ElicitationCapability::default),
            tasks: opts.supports_tasks.then(TasksCapability::tool_calls),
        }
    }
}
