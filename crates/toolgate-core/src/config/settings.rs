//! Orchestrator tuning knobs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tools::{CatalogOptions, CollisionPolicy, NamingStyle};

/// Settings shared by the manager and the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Upper bound for spawn + discovery, and for refresh/health probes
    pub discovery_timeout_ms: u64,
    /// Upper bound for a single tool invocation
    pub tool_call_timeout_ms: u64,
    pub naming: NamingStyle,
    pub collision: CollisionPolicy,
    /// Append built-in tools to the catalog
    pub builtin_tools: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            discovery_timeout_ms: 30_000,
            tool_call_timeout_ms: 60_000,
            naming: NamingStyle::default(),
            collision: CollisionPolicy::default(),
            builtin_tools: true,
        }
    }
}

impl OrchestratorSettings {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn tool_call_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_call_timeout_ms)
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            naming: self.naming,
            collision: self.collision,
        }
    }
}
