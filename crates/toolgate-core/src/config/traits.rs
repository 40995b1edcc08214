//! Configuration provider trait

use async_trait::async_trait;

use super::settings::OrchestratorSettings;
use crate::types::{ProviderConfig, ServerConfig};

/// Source of tool server definitions, provider settings and orchestrator settings
///
/// Implementations:
/// - `MemoryConfigProvider`: In-memory for tests and embedding hosts
/// - `FileConfigProvider`: YAML file (~/.config/toolgate/config.yaml)
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Configured tool servers, in registration order
    async fn get_servers(&self) -> Vec<ServerConfig>;

    /// Add a new server definition
    async fn add_server(&self, config: ServerConfig) -> ConfigResult<()>;

    /// Replace the definition stored under `id`
    async fn update_server(&self, id: &str, config: ServerConfig) -> ConfigResult<()>;

    /// Remove a server definition
    async fn remove_server(&self, id: &str) -> ConfigResult<()>;

    /// Per-provider transport settings
    async fn get_providers(&self) -> Vec<ProviderConfig>;

    async fn get_settings(&self) -> OrchestratorSettings;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Server already exists: {0}")]
    ServerExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
