//! File-based configuration provider (YAML)
//!
//! Supports user-level (~/.config/toolgate/config.yaml) and workspace-level
//! (.config/toolgate/config.yaml) files.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::settings::OrchestratorSettings;
use super::traits::{ConfigError, ConfigProvider, ConfigResult};
use crate::types::{ProviderConfig, ServerConfig};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Tool servers, in registration order
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Provider transport settings
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
}

impl ConfigFile {
    pub(crate) fn insert_server(&mut self, config: ServerConfig) -> ConfigResult<()> {
        if self.servers.iter().any(|s| s.id == config.id) {
            return Err(ConfigError::ServerExists(config.id));
        }
        self.servers.push(config);
        Ok(())
    }

    pub(crate) fn replace_server(&mut self, id: &str, config: ServerConfig) -> ConfigResult<()> {
        match self.servers.iter_mut().find(|s| s.id == id) {
            Some(slot) => {
                *slot = config;
                Ok(())
            }
            None => Err(ConfigError::ServerNotFound(id.to_string())),
        }
    }
}

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    User,
    Workspace,
}

/// File-based configuration provider
///
/// ```no_run
/// use toolgate_core::config::FileConfigProvider;
///
/// let user_config = FileConfigProvider::user();
/// let workspace_config = FileConfigProvider::workspace("/path/to/workspace");
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// User-level config provider (~/.config/toolgate/config.yaml)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("toolgate").join("config.yaml"), ConfigLevel::User)
    }

    /// Workspace-level config provider (.config/toolgate/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root.as_ref().join(".config").join("toolgate").join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_yaml::to_string(config)?)?;
        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    /// Cached config, loading from disk on first use
    pub fn config(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Copy the current file next to itself with a `.backup` suffix
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }
        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }

    /// Persist new orchestrator settings
    pub fn set_settings(&self, settings: OrchestratorSettings) -> ConfigResult<()> {
        let mut config = self.config()?;
        config.orchestrator = settings;
        self.save(&config)
    }

    fn update<F>(&self, f: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut ConfigFile) -> ConfigResult<()>,
    {
        let mut config = self.config()?;
        f(&mut config)?;
        self.save(&config)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn get_servers(&self) -> Vec<ServerConfig> {
        self.config().map(|c| c.servers).unwrap_or_default()
    }

    async fn add_server(&self, config: ServerConfig) -> ConfigResult<()> {
        self.update(|file| file.insert_server(config))
    }

    async fn update_server(&self, id: &str, config: ServerConfig) -> ConfigResult<()> {
        self.update(|file| file.replace_server(id, config))
    }

    async fn remove_server(&self, id: &str) -> ConfigResult<()> {
        self.update(|file| {
            let before = file.servers.len();
            file.servers.retain(|s| s.id != id);
            if file.servers.len() == before {
                Err(ConfigError::ServerNotFound(id.to_string()))
            } else {
                Ok(())
            }
        })
    }

    async fn get_providers(&self) -> Vec<ProviderConfig> {
        self.config().map(|c| c.providers).unwrap_or_default()
    }

    async fn get_settings(&self) -> OrchestratorSettings {
        self.config().map(|c| c.orchestrator).unwrap_or_default()
    }
}
