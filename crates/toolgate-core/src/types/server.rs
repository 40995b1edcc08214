//! Tool server configuration and lifecycle state

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identity and launch spec for a tool server
///
/// Immutable once a handle exists; changing it means remove + add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Caller-assigned unique id
    pub id: String,
    /// Display name
    pub name: String,
    /// Executable path or name
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Merged over the inherited environment
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ServerConfig {
    /// Create a config whose display name equals its id
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            command: command.into(),
            args: vec![],
            env: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Connection state of a tool server handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Starting,
    Connected,
    Error,
}

/// Lifecycle events driving [`ConnectionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A start attempt begins
    Start,
    /// Discovery (initial or refresh) succeeded
    Discovered,
    /// Spawn, discovery or health probe failed
    Failed,
    /// The process was terminated on request
    Stop,
}

impl ConnectionState {
    /// Total transition function; `None` marks a transition that is not allowed
    pub fn transition(self, event: LifecycleEvent) -> Option<ConnectionState> {
        use ConnectionState::*;
        use LifecycleEvent::*;

        match (self, event) {
            (Disconnected | Error, Start) => Some(Starting),
            (Starting | Connected | Error, Discovered) => Some(Connected),
            (Starting | Connected | Error, Failed) => Some(Error),
            (_, Stop) => Some(Disconnected),
            (Connected | Starting, Start) => None,
            (Disconnected, Discovered | Failed) => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Starting => write!(f, "starting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Error => write!(f, "error"),
        }
    }
}

/// Status record returned by server listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub id: String,
    pub name: String,
    pub state: ConnectionState,
    #[serde(rename = "isConnected")]
    pub is_connected: bool,
    #[serde(rename = "lastError", skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(rename = "toolCount")]
    pub tool_count: usize,
}
