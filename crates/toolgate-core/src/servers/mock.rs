//! Scripted launcher for testing
//!
//! Stands in for real tool server processes: each server id gets a script
//! describing its tools and how spawn, discovery and invocation behave.
//! Scripts can be swapped while a connection is live, which is how tests
//! make a refresh or health probe fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::error::{ServerError, ServerResult};
use super::launcher::{ServerConnection, ServerLauncher, ToolOutput};
use crate::types::{ServerConfig, ToolDescriptor};

/// How a scripted server behaves
#[derive(Debug, Clone, Default)]
pub enum MockMode {
    /// Spawns and answers discovery with its tools
    #[default]
    Ready,
    /// The process cannot be spawned
    FailSpawn(String),
    /// Discovery returns an error
    FailDiscovery(String),
    /// Discovery never answers
    HangDiscovery,
    /// Discovery answers after a delay
    SlowDiscovery(Duration),
    /// Discovery works; every invocation fails at the transport level
    FailCalls(String),
    /// Discovery works; the server rejects every invocation with a protocol error
    RejectCalls(String),
}

/// Script for one server id
#[derive(Debug, Clone, Default)]
pub struct MockServer {
    pub tools: Vec<ToolDescriptor>,
    pub mode: MockMode,
    /// Canned outputs by tool name; other tools echo their arguments
    pub responses: HashMap<String, ToolOutput>,
}

impl MockServer {
    pub fn with_tools(tools: Vec<ToolDescriptor>) -> Self {
        Self {
            tools,
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: MockMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn respond(mut self, tool: impl Into<String>, output: ToolOutput) -> Self {
        self.responses.insert(tool.into(), output);
        self
    }
}

#[derive(Default)]
struct MockShared {
    scripts: RwLock<HashMap<String, MockServer>>,
    launches: AtomicUsize,
    shutdowns: AtomicUsize,
    calls: AtomicUsize,
}

impl MockShared {
    fn script(&self, id: &str) -> Option<MockServer> {
        self.scripts.read().get(id).cloned()
    }
}

/// Launcher whose processes are scripted in memory
#[derive(Clone, Default)]
pub struct MockLauncher {
    shared: Arc<MockShared>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the script for `id`; live connections see the change
    pub fn script(&self, id: impl Into<String>, server: MockServer) -> &Self {
        self.shared.scripts.write().insert(id.into(), server);
        self
    }

    /// Change only the mode of an existing script
    pub fn set_mode(&self, id: &str, mode: MockMode) {
        if let Some(server) = self.shared.scripts.write().get_mut(id) {
            server.mode = mode;
        }
    }

    /// Replace only the tool list of an existing script
    pub fn set_tools(&self, id: &str, tools: Vec<ToolDescriptor>) {
        if let Some(server) = self.shared.scripts.write().get_mut(id) {
            server.tools = tools;
        }
    }

    /// Spawn attempts, successful or not
    pub fn launch_count(&self) -> usize {
        self.shared.launches.load(Ordering::SeqCst)
    }

    /// Connections that were shut down
    pub fn shutdown_count(&self) -> usize {
        self.shared.shutdowns.load(Ordering::SeqCst)
    }

    /// Tool invocations that reached a connection
    pub fn call_count(&self) -> usize {
        self.shared.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServerLauncher for MockLauncher {
    async fn launch(&self, config: &ServerConfig) -> ServerResult<Arc<dyn ServerConnection>> {
        self.shared.launches.fetch_add(1, Ordering::SeqCst);

        let script = self
            .shared
            .script(&config.id)
            .ok_or_else(|| ServerError::spawn(&config.command, "No such file or directory"))?;
        if let MockMode::FailSpawn(message) = script.mode {
            return Err(ServerError::spawn(&config.command, message));
        }

        Ok(Arc::new(MockConnection {
            server_id: config.id.clone(),
            shared: self.shared.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MockConnection {
    server_id: String,
    shared: Arc<MockShared>,
    closed: AtomicBool,
}

impl MockConnection {
    fn current(&self) -> ServerResult<MockServer> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ServerError::NotConnected(self.server_id.clone()));
        }
        self.shared
            .script(&self.server_id)
            .ok_or_else(|| ServerError::NotConnected(self.server_id.clone()))
    }
}

#[async_trait]
impl ServerConnection for MockConnection {
    async fn list_tools(&self) -> ServerResult<Vec<ToolDescriptor>> {
        let script = self.current()?;
        match script.mode {
            MockMode::FailDiscovery(message) => Err(ServerError::DiscoveryFailure(message)),
            MockMode::HangDiscovery => std::future::pending().await,
            MockMode::SlowDiscovery(delay) => {
                tokio::time::sleep(delay).await;
                Ok(script.tools)
            }
            MockMode::Ready | MockMode::FailCalls(_) | MockMode::RejectCalls(_) | MockMode::FailSpawn(_) => {
                Ok(script.tools)
            }
        }
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ServerResult<ToolOutput> {
        let script = self.current()?;
        self.shared.calls.fetch_add(1, Ordering::SeqCst);

        match script.mode {
            MockMode::FailCalls(message) => return Err(ServerError::Transport(message)),
            MockMode::RejectCalls(message) => return Err(ServerError::ToolCall(message)),
            _ => {}
        }
        if !script.tools.iter().any(|t| t.name == name) {
            return Ok(ToolOutput::error(format!("Unknown tool: {}", name)));
        }
        Ok(script
            .responses
            .get(name)
            .cloned()
            .unwrap_or_else(|| ToolOutput::text(arguments.to_string())))
    }

    async fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shared.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }
}
