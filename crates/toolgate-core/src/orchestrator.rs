//! Boundary operations over the tool server manager and the provider gateway
//!
//! Request handlers (HTTP, IPC, CLI) call into an [`Orchestrator`] and format its
//! outcomes; they never reach into the manager or the gateway directly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ConfigProvider;
use crate::logging::SharedLogger;
use crate::providers::{GatewayResult, ProviderGateway, ProviderResponse, SendOptions};
use crate::secrets::SecretStore;
use crate::servers::{ServerError, ServerLauncher, ServerResult, ToolServerManager};
use crate::types::{
    CallableTool, CancellationToken, ChatMessage, ModelDescriptor, ServerConfig, ServerStatus, ToolCall, ToolResult,
};
use crate::{log_info, log_warn};

/// Outcome of adding a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddServerOutcome {
    pub started: bool,
}

/// Outcome of start, stop and refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub success: bool,
}

/// Result of replaying configured servers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub started: Vec<String>,
    /// Registered but left in `Error`
    pub failed: Vec<String>,
    /// Already registered, left untouched
    pub skipped: Vec<String>,
}

pub struct Orchestrator {
    manager: Arc<ToolServerManager>,
    gateway: Arc<ProviderGateway>,
    logger: SharedLogger,
}

impl Orchestrator {
    pub fn new(manager: Arc<ToolServerManager>, gateway: Arc<ProviderGateway>, logger: SharedLogger) -> Self {
        Self {
            manager,
            gateway,
            logger,
        }
    }

    /// Build manager and gateway from configuration; servers are not started
    pub async fn from_config(
        config: &dyn ConfigProvider,
        launcher: Arc<dyn ServerLauncher>,
        secrets: Arc<dyn SecretStore>,
        logger: SharedLogger,
    ) -> Self {
        let settings = config.get_settings().await;
        let providers = config.get_providers().await;

        let manager = ToolServerManager::new(launcher, logger.clone()).with_settings(settings);
        let gateway = ProviderGateway::from_configs(&providers, secrets, logger.clone());

        Self::new(Arc::new(manager), Arc::new(gateway), logger)
    }

    pub fn manager(&self) -> &Arc<ToolServerManager> {
        &self.manager
    }

    pub fn gateway(&self) -> &Arc<ProviderGateway> {
        &self.gateway
    }

    /// Register and start every configured server, in configuration order
    pub async fn load_servers(&self, config: &dyn ConfigProvider) -> LoadReport {
        let mut report = LoadReport::default();

        for server in config.get_servers().await {
            let id = server.id.clone();
            match self.manager.add_server(server).await {
                Ok(true) => report.started.push(id),
                Ok(false) => report.failed.push(id),
                Err(ServerError::DuplicateId(_)) => {
                    log_warn!(self.logger, "[Orchestrator] Server '{}' is already registered", id);
                    report.skipped.push(id);
                }
                Err(e) => {
                    log_warn!(self.logger, "[Orchestrator] Could not add server '{}': {}", id, e);
                    report.failed.push(id);
                }
            }
        }

        log_info!(
            self.logger,
            "[Orchestrator] Loaded servers: {} started, {} failed, {} skipped",
            report.started.len(),
            report.failed.len(),
            report.skipped.len()
        );
        report
    }

    pub async fn add_server(&self, config: ServerConfig) -> ServerResult<AddServerOutcome> {
        let started = self.manager.add_server(config).await?;
        Ok(AddServerOutcome { started })
    }

    pub async fn start_server(&self, id: &str) -> ServerResult<OperationOutcome> {
        let success = self.manager.start_server(id).await?;
        Ok(OperationOutcome { success })
    }

    pub async fn stop_server(&self, id: &str) -> OperationOutcome {
        OperationOutcome {
            success: self.manager.stop_server(id).await,
        }
    }

    pub async fn remove_server(&self, id: &str) {
        self.manager.remove_server(id).await
    }

    pub async fn refresh_server(&self, id: &str) -> ServerResult<OperationOutcome> {
        let success = self.manager.refresh_server(id).await?;
        Ok(OperationOutcome { success })
    }

    pub fn list_servers(&self) -> Vec<ServerStatus> {
        self.manager.get_servers_status()
    }

    pub fn list_tools(&self) -> Vec<CallableTool> {
        self.manager.get_all_tools()
    }

    pub async fn call_tool(&self, call: &ToolCall) -> ToolResult {
        self.manager.call_tool(call).await
    }

    pub async fn call_tools(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        self.manager.call_tools(calls).await
    }

    /// Ids of servers moved to `Error` by this probe
    pub async fn check_health(&self) -> Vec<String> {
        self.manager.check_health().await
    }

    /// Send a conversation with exactly the tools in `options`
    pub async fn send_message(
        &self,
        messages: &[ChatMessage],
        model: &ModelDescriptor,
        options: &SendOptions,
        cancel: &CancellationToken,
    ) -> GatewayResult<ProviderResponse> {
        self.gateway.send_message(messages, model, options, cancel).await
    }

    /// Send a conversation offering the current tool catalog
    pub async fn send_message_with_tools(
        &self,
        messages: &[ChatMessage],
        model: &ModelDescriptor,
        options: SendOptions,
        cancel: &CancellationToken,
    ) -> GatewayResult<ProviderResponse> {
        let options = options.with_tools(self.list_tools());
        self.gateway.send_message(messages, model, &options, cancel).await
    }

    /// Stop every server
    pub async fn shutdown(&self) {
        self.manager.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, MemoryConfigProvider, OrchestratorSettings};
    use crate::logging::NoOpLogger;
    use crate::providers::{MockReply, MockTransport};
    use crate::secrets::MemorySecretStore;
    use crate::servers::{MockLauncher, MockMode, MockServer};
    use crate::types::{ModelCapability, ProviderConfig, ProviderKind, ToolDescriptor};
    use serde_json::json;

    fn calc() -> MockServer {
        MockServer::with_tools(vec![ToolDescriptor::new("add", "Add two numbers").with_schema(json!({
            "type": "object",
            "properties": {"a": {"type": "number"}, "b": {"type": "number"}}
        }))])
    }

    fn orchestrator(launcher: Arc<MockLauncher>, transport: Arc<MockTransport>) -> Orchestrator {
        let logger: SharedLogger = Arc::new(NoOpLogger::new());
        let manager = ToolServerManager::new(launcher, logger.clone());
        let gateway = ProviderGateway::new(logger.clone()).with_transport(ProviderKind::Mock, transport);
        Orchestrator::new(Arc::new(manager), Arc::new(gateway), logger)
    }

    #[tokio::test]
    async fn test_calc_scenario() {
        let launcher = Arc::new(MockLauncher::new());
        launcher.script("calc", calc());
        let orchestrator = orchestrator(launcher, Arc::new(MockTransport::echo()));

        let added = orchestrator
            .add_server(ServerConfig::new("calc", "calc-server"))
            .await
            .unwrap();
        assert_eq!(added, AddServerOutcome { started: true });

        let names: Vec<_> = orchestrator.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["calc:add", "sequential_thinking"]);

        assert_eq!(orchestrator.stop_server("calc").await, OperationOutcome { success: true });
        let names: Vec<_> = orchestrator.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["sequential_thinking"]);

        assert_eq!(
            orchestrator.add_server(ServerConfig::new("calc", "calc-server")).await,
            Err(ServerError::DuplicateId("calc".to_string()))
        );
    }

    #[tokio::test]
    async fn test_send_message_with_catalog() {
        let launcher = Arc::new(MockLauncher::new());
        launcher.script("calc", calc());
        let transport = Arc::new(MockTransport::new(MockReply::ToolCalls(vec![ToolCall::new(
            "call_1",
            "calc__add",
            json!({"a": 1, "b": 2}),
        )])));
        let orchestrator = orchestrator(launcher, transport.clone());
        orchestrator
            .add_server(ServerConfig::new("calc", "calc-server"))
            .await
            .unwrap();

        let model = ModelDescriptor::new("mock-tools", "mock").with_capability(ModelCapability::FunctionCalling);
        let response = orchestrator
            .send_message_with_tools(
                &[ChatMessage::user("What is 1 + 2?")],
                &model,
                SendOptions::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let offered = transport.last_request().unwrap().body["tools"].as_array().unwrap().len();
        assert_eq!(offered, 2);
        assert_eq!(response.tool_calls[0].name, "calc:add");

        let results = orchestrator.call_tools(&response.tool_calls).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].call_id, "call_1");
        assert!(!results[0].is_error);
    }

    #[tokio::test]
    async fn test_load_servers_from_config() {
        let launcher = Arc::new(MockLauncher::new());
        launcher.script("calc", calc());
        launcher.script("broken", MockServer::default().mode(MockMode::FailSpawn("not found".into())));

        let config = MemoryConfigProvider::from_config(ConfigFile {
            servers: vec![
                ServerConfig::new("calc", "calc-server"),
                ServerConfig::new("broken", "missing-binary"),
            ],
            providers: vec![ProviderConfig::new("openai").disabled()],
            orchestrator: OrchestratorSettings {
                builtin_tools: false,
                ..OrchestratorSettings::default()
            },
        });

        let orchestrator = Orchestrator::from_config(
            &config,
            launcher,
            Arc::new(MemorySecretStore::new()),
            Arc::new(NoOpLogger::new()),
        )
        .await;
        assert!(!orchestrator.gateway().supports(ProviderKind::OpenAi));
        assert!(orchestrator.gateway().supports(ProviderKind::Anthropic));

        let report = orchestrator.load_servers(&config).await;
        assert_eq!(report.started, vec!["calc".to_string()]);
        assert_eq!(report.failed, vec!["broken".to_string()]);

        let names: Vec<_> = orchestrator.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["calc:add"]);

        // Replaying is harmless
        let report = orchestrator.load_servers(&config).await;
        assert_eq!(report.skipped.len(), 2);
        assert!(report.started.is_empty());

        orchestrator.shutdown().await;
        assert!(orchestrator.list_tools().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let orchestrator = orchestrator(Arc::new(MockLauncher::new()), Arc::new(MockTransport::echo()));

        assert!(matches!(
            orchestrator.start_server("ghost").await,
            Err(ServerError::UnknownId(_))
        ));
        assert!(matches!(
            orchestrator.refresh_server("ghost").await,
            Err(ServerError::UnknownId(_))
        ));
        assert_eq!(orchestrator.stop_server("ghost").await, OperationOutcome { success: false });
        orchestrator.remove_server("ghost").await;
        assert!(orchestrator.list_servers().is_empty());
        assert!(orchestrator.check_health().await.is_empty());
    }
}
