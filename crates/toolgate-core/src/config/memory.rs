//! In-memory configuration provider

use async_trait::async_trait;
use parking_lot::RwLock;

use super::file::ConfigFile;
use super::settings::OrchestratorSettings;
use super::traits::{ConfigError, ConfigProvider, ConfigResult};
use crate::types::{ProviderConfig, ServerConfig};

/// In-memory configuration provider
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    config: RwLock<ConfigFile>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider holding `servers` and default settings
    pub fn with_servers(servers: Vec<ServerConfig>) -> Self {
        Self::from_config(ConfigFile {
            servers,
            ..ConfigFile::default()
        })
    }

    pub fn from_config(config: ConfigFile) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    pub fn set_settings(&self, settings: OrchestratorSettings) {
        self.config.write().orchestrator = settings;
    }

    pub fn set_providers(&self, providers: Vec<ProviderConfig>) {
        self.config.write().providers = providers;
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    async fn get_servers(&self) -> Vec<ServerConfig> {
        self.config.read().servers.clone()
    }

    async fn add_server(&self, config: ServerConfig) -> ConfigResult<()> {
        self.config.write().insert_server(config)
    }

    async fn update_server(&self, id: &str, config: ServerConfig) -> ConfigResult<()> {
        self.config.write().replace_server(id, config)
    }

    async fn remove_server(&self, id: &str) -> ConfigResult<()> {
        let mut guard = self.config.write();
        let before = guard.servers.len();
        guard.servers.retain(|s| s.id != id);
        if guard.servers.len() == before {
            Err(ConfigError::ServerNotFound(id.to_string()))
        } else {
            Ok(())
        }
    }

    async fn get_providers(&self) -> Vec<ProviderConfig> {
        self.config.read().providers.clone()
    }

    async fn get_settings(&self) -> OrchestratorSettings {
        self.config.read().orchestrator.clone()
    }
}
