//! Launcher for MCP servers speaking over stdio, using the official rmcp SDK

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation, RawContent, Tool},
    service::{Peer, RunningService},
    transport::{ConfigureCommandExt, TokioChildProcess},
    RoleClient, ServiceError, ServiceExt,
};
use serde_json::Value;
use tokio::sync::Mutex;

use super::error::{ServerError, ServerResult};
use super::launcher::{ServerConnection, ServerLauncher, ToolOutput};
use crate::logging::Logger;
use crate::types::{normalize_schema, ServerConfig, ToolDescriptor};

/// Spawns `command args...` with `env` merged over the inherited environment
pub struct McpLauncher {
    logger: Arc<dyn Logger>,
}

impl McpLauncher {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    fn client_info() -> ClientInfo {
        ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "toolgate".to_string(),
                title: Some("Toolgate".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
        }
    }
}

#[async_trait]
impl ServerLauncher for McpLauncher {
    async fn launch(&self, config: &ServerConfig) -> ServerResult<Arc<dyn ServerConnection>> {
        self.logger.info(&format!(
            "[McpLauncher] Spawning '{}': {} {}",
            config.id,
            config.command,
            config.args.join(" ")
        ));

        let transport = TokioChildProcess::new(tokio::process::Command::new(&config.command).configure(|cmd| {
            cmd.args(&config.args)
                .envs(config.env.iter())
                .stderr(Stdio::inherit())
                .kill_on_drop(true);
        }))
        .map_err(|e| ServerError::spawn(&config.command, e))?;

        let service = Self::client_info()
            .serve(transport)
            .await
            .map_err(|e| ServerError::DiscoveryFailure(format!("initialize: {}", e)))?;

        if let Some(info) = service.peer_info() {
            self.logger.debug(&format!(
                "[McpLauncher] '{}' is {} {}",
                config.id, info.server_info.name, info.server_info.version
            ));
        }

        Ok(Arc::new(McpConnection {
            server_id: config.id.clone(),
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            logger: self.logger.clone(),
        }))
    }
}

/// An initialized rmcp client session over a child process
pub struct McpConnection {
    server_id: String,
    /// Request handle; cloned so calls do not contend on `service`
    peer: Peer<RoleClient>,
    /// Owner of the session task and the child; taken on shutdown
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
    logger: Arc<dyn Logger>,
}

impl McpConnection {
    fn descriptor(tool: Tool) -> ToolDescriptor {
        ToolDescriptor {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
            input_schema: normalize_schema(Value::Object(tool.input_schema.as_ref().clone())),
        }
    }

    fn output(result: CallToolResult) -> ToolOutput {
        let text = result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        ToolOutput {
            content: text,
            is_error: result.is_error.unwrap_or(false),
        }
    }
}

/// Protocol rejections and request timeouts stay tool errors; anything else means the connection is gone
fn call_error(error: ServiceError) -> ServerError {
    match error {
        ServiceError::McpError(e) => ServerError::ToolCall(e.message.to_string()),
        other @ (ServiceError::UnexpectedResponse | ServiceError::Timeout { .. }) => {
            ServerError::ToolCall(other.to_string())
        }
        other => ServerError::Transport(other.to_string()),
    }
}

#[async_trait]
impl ServerConnection for McpConnection {
    async fn list_tools(&self) -> ServerResult<Vec<ToolDescriptor>> {
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| ServerError::DiscoveryFailure(e.to_string()))?;

        self.logger.debug(&format!(
            "[McpConnection] '{}' listed {} tools",
            self.server_id,
            tools.len()
        ));
        Ok(tools.into_iter().map(Self::descriptor).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ServerResult<ToolOutput> {
        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = self.peer.call_tool(params).await.map_err(call_error)?;
        Ok(Self::output(result))
    }

    async fn shutdown(&self) {
        let Some(service) = self.service.lock().await.take() else {
            return;
        };
        self.logger.info(&format!("[McpConnection] Shutting down '{}'", self.server_id));
        if let Err(e) = service.cancel().await {
            self.logger.warn(&format!(
                "[McpConnection] Error closing '{}': {}",
                self.server_id, e
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[tokio::test]
    async fn test_missing_command_is_spawn_error() {
        let launcher = McpLauncher::new(Arc::new(NoOpLogger::new()));
        let config = ServerConfig::new("ghost", "/nonexistent/toolgate-test-binary");

        let err = launcher.launch(&config).await.err().unwrap();
        assert!(matches!(err, ServerError::Spawn { ref command, .. } if command == "/nonexistent/toolgate-test-binary"));
    }

    #[test]
    fn test_call_error_split() {
        let invalid = rmcp::model::ErrorData::invalid_params("missing field 'b'", None);
        let invalid = ServiceError::McpError(invalid);
        assert_eq!(call_error(invalid), ServerError::ToolCall("missing field 'b'".into()));
        assert!(matches!(
            call_error(ServiceError::UnexpectedResponse),
            ServerError::ToolCall(_)
        ));
        assert!(matches!(
            call_error(ServiceError::Timeout {
                timeout: std::time::Duration::from_secs(30)
            }),
            ServerError::ToolCall(_)
        ));
        assert!(matches!(
            call_error(ServiceError::TransportClosed),
            ServerError::Transport(_)
        ));
        assert!(matches!(
            call_error(ServiceError::Cancelled { reason: None }),
            ServerError::Transport(_)
        ));
    }
}
