//! Seams between the manager and running tool server processes

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::error::ServerResult;
use crate::types::{ServerConfig, ToolDescriptor};

/// Text returned by a tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    /// The server reported the invocation as failed
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A live, initialized session with one tool server process
#[async_trait]
pub trait ServerConnection: Send + Sync {
    /// Discovery call
    async fn list_tools(&self) -> ServerResult<Vec<ToolDescriptor>>;

    /// Invoke call, using the server's own (unqualified) tool name
    async fn call_tool(&self, name: &str, arguments: Value) -> ServerResult<ToolOutput>;

    /// Terminate the session and its process; repeated calls are no-ops
    async fn shutdown(&self);
}

/// Spawns a process for a [`ServerConfig`] and completes the protocol handshake
#[async_trait]
pub trait ServerLauncher: Send + Sync {
    async fn launch(&self, config: &ServerConfig) -> ServerResult<Arc<dyn ServerConnection>>;
}
