//! Connection-lifetime session state: negotiated version, capabilities, log
//! threshold, resource subscriptions and the server-side request id counter.

use std::collections::HashSet;

use easymcp::capabilities::{ClientCapabilities, Implementation};
use easymcp::{LogLevel, ProtocolVersion, RequestId, ServerCapabilities};

/// Shared state of the one session this engine serves.
#[derive(Debug)]
pub struct SessionState {
    protocol_version: ProtocolVersion,
    capabilities: ServerCapabilities,
    client_capabilities: ClientCapabilities,
    client_info: Option<Implementation>,
    initialized: bool,
    log_level: Option<LogLevel>,
    subscriptions: HashSet<String>,
    next_id: i64,
}

impl SessionState {
    pub fn new(protocol_version: ProtocolVersion, capabilities: ServerCapabilities) -> Self {
        Self {
            protocol_version,
            capabilities,
            client_capabilities: ClientCapabilities::default(),
            client_info: None,
            initialized: false,
            log_level: None,
            subscriptions: HashSet::new(),
            next_id: 1,
        }
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    pub fn client_capabilities(&self) -> &ClientCapabilities {
        &self.client_capabilities
    }

    pub fn client_info(&self) -> Option<&Implementation> {
        self.client_info.as_ref()
    }

    /// Record the outcome of `initialize`.
    pub fn adopt(
        &mut self,
        version: ProtocolVersion,
        capabilities: ServerCapabilities,
        client_capabilities: ClientCapabilities,
        client_info: Option<Implementation>,
    ) {
        self.protocol_version = version;
        self.capabilities = capabilities;
        self.client_capabilities = client_capabilities;
        self.client_info = client_info;
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = Some(level);
    }

    /// A client log line is emitted only with logging enabled, a threshold set,
    /// and `level` at least as severe as that threshold.
    pub fn should_log(&self, level: LogLevel) -> bool {
        self.capabilities.logging_enabled()
            && self
                .log_level
                .is_some_and(|threshold| level.passes(threshold))
    }

    pub fn subscribe(&mut self, uri: impl Into<String>) {
        self.subscriptions.insert(uri.into());
    }

    pub fn is_subscribed(&self, uri: &str) -> bool {
        self.subscriptions.contains(uri)
    }

    /// Next id for a server-initiated request.
    pub fn next_request_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        RequestId::Number(id)
    }
}
