//! Tool server manager
//!
//! Owns the registry of tool server handles. Lifecycle operations on one id
//! are serialized by that handle's async mutex; different ids proceed
//! concurrently. Status and catalog reads only take short synchronous locks
//! and may observe a handle in `Starting`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::time::Instant;

use super::error::{ServerError, ServerResult};
use super::launcher::{ServerConnection, ServerLauncher, ToolOutput};
use crate::config::OrchestratorSettings;
use crate::logging::Logger;
use crate::tools::{build_catalog, default_builtins, resolve, BuiltinTool, ServerTools};
use crate::types::{
    normalize_schema, CallableTool, CancellationToken, ConnectionState, LifecycleEvent, ServerConfig, ServerStatus,
    ToolCall, ToolDescriptor, ToolOrigin, ToolResult,
};

/// Mutable part of a handle
#[derive(Default)]
struct HandleState {
    state: ConnectionState,
    tools: Vec<ToolDescriptor>,
    last_error: Option<String>,
    connection: Option<Arc<dyn ServerConnection>>,
    /// Set once the handle has left the registry
    removed: bool,
}

impl HandleState {
    fn apply(&mut self, event: LifecycleEvent) -> bool {
        match self.state.transition(event) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }

    fn fail(&mut self, error: &ServerError) -> Option<Arc<dyn ServerConnection>> {
        self.apply(LifecycleEvent::Failed);
        self.tools.clear();
        self.last_error = Some(error.to_string());
        self.connection.take()
    }
}

/// One registered tool server
struct ServerHandle {
    /// Registration order, used for catalog ordering and collision resolution
    seq: u64,
    config: ServerConfig,
    lifecycle: tokio::sync::Mutex<()>,
    inner: RwLock<HandleState>,
}

impl ServerHandle {
    fn status(&self) -> ServerStatus {
        let inner = self.inner.read();
        ServerStatus {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            state: inner.state,
            is_connected: inner.state.is_connected(),
            last_error: inner.last_error.clone(),
            tool_count: inner.tools.len(),
        }
    }
}

/// Settles a handle still in `Starting` when a start is dropped mid-flight
///
/// Holds the launched connection so it can be shut down in the background.
struct StartGuard<'a> {
    handle: &'a ServerHandle,
    connection: Option<Arc<dyn ServerConnection>>,
    armed: bool,
}

impl<'a> StartGuard<'a> {
    fn new(handle: &'a ServerHandle) -> Self {
        Self {
            handle,
            connection: None,
            armed: true,
        }
    }

    fn settle(&mut self) {
        self.armed = false;
        self.connection = None;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        {
            let mut inner = self.handle.inner.write();
            if inner.state == ConnectionState::Starting {
                inner.apply(LifecycleEvent::Failed);
                inner.tools.clear();
                inner.last_error = Some(START_ABANDONED.to_string());
            }
        }
        if let Some(connection) = self.connection.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move { connection.shutdown().await });
            }
        }
    }
}

const START_ABANDONED: &str = "start abandoned";

/// Run `fut` until it finishes, `deadline` passes or `cancel` fires
async fn bounded<T, F>(fut: F, deadline: Instant, limit: Duration, cancel: &CancellationToken) -> ServerResult<T>
where
    F: Future<Output = ServerResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ServerError::Cancelled),
        result = tokio::time::timeout_at(deadline, fut) => {
            result.unwrap_or(Err(ServerError::DiscoveryTimeout(limit)))
        }
    }
}

fn normalize_tools(tools: Vec<ToolDescriptor>) -> Vec<ToolDescriptor> {
    tools
        .into_iter()
        .map(|mut tool| {
            tool.input_schema = normalize_schema(tool.input_schema);
            tool
        })
        .collect()
}

/// Registry and lifecycle driver for tool server processes
pub struct ToolServerManager {
    launcher: Arc<dyn ServerLauncher>,
    builtins: Vec<Arc<dyn BuiltinTool>>,
    settings: OrchestratorSettings,
    servers: RwLock<HashMap<String, Arc<ServerHandle>>>,
    next_seq: AtomicU64,
    logger: Arc<dyn Logger>,
}

impl ToolServerManager {
    /// Create a manager with default settings and the default built-ins
    pub fn new(launcher: Arc<dyn ServerLauncher>, logger: Arc<dyn Logger>) -> Self {
        Self {
            launcher,
            builtins: default_builtins(),
            settings: OrchestratorSettings::default(),
            servers: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            logger,
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the built-in tool set
    pub fn with_builtins(mut self, builtins: Vec<Arc<dyn BuiltinTool>>) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    fn handle(&self, id: &str) -> ServerResult<Arc<ServerHandle>> {
        self.servers
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ServerError::UnknownId(id.to_string()))
    }

    /// Handles in registration order
    fn handles(&self) -> Vec<Arc<ServerHandle>> {
        let mut handles: Vec<_> = self.servers.read().values().cloned().collect();
        handles.sort_by_key(|h| h.seq);
        handles
    }

    /// Register a server and immediately try to start it
    ///
    /// Returns whether the start succeeded; a failed start leaves the
    /// handle registered in `Error`.
    pub async fn add_server(&self, config: ServerConfig) -> ServerResult<bool> {
        let handle = {
            let mut servers = self.servers.write();
            if servers.contains_key(&config.id) {
                return Err(ServerError::DuplicateId(config.id));
            }
            let handle = Arc::new(ServerHandle {
                seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
                config,
                lifecycle: tokio::sync::Mutex::new(()),
                inner: RwLock::new(HandleState::default()),
            });
            servers.insert(handle.config.id.clone(), handle.clone());
            handle
        };

        self.logger.info(&format!(
            "[ToolServerManager] Added server '{}' ({})",
            handle.config.id, handle.config.name
        ));

        // A concurrent remove may win the race; that reads as a failed start
        Ok(self
            .start_handle(&handle, &CancellationToken::new())
            .await
            .unwrap_or(false))
    }

    /// Start a registered server; succeeds immediately if already connected
    pub async fn start_server(&self, id: &str) -> ServerResult<bool> {
        self.start_server_with_cancel(id, &CancellationToken::new()).await
    }

    /// Like [`start_server`](Self::start_server), abandoning the attempt when `cancel` fires
    pub async fn start_server_with_cancel(&self, id: &str, cancel: &CancellationToken) -> ServerResult<bool> {
        let handle = self.handle(id)?;
        self.start_handle(&handle, cancel).await
    }

    async fn start_handle(&self, handle: &ServerHandle, cancel: &CancellationToken) -> ServerResult<bool> {
        let _lifecycle = handle.lifecycle.lock().await;
        let id = &handle.config.id;

        let stale = {
            let mut inner = handle.inner.write();
            if inner.removed {
                return Err(ServerError::UnknownId(id.clone()));
            }
            if inner.state.is_connected() {
                return Ok(true);
            }
            self.transition(id, &mut inner, LifecycleEvent::Start);
            inner.last_error = None;
            inner.tools.clear();
            inner.connection.take()
        };
        let mut guard = StartGuard::new(handle);
        // A process left behind by a failed refresh
        if let Some(stale) = stale {
            stale.shutdown().await;
        }

        let limit = self.settings.discovery_timeout();
        let deadline = Instant::now() + limit;

        let launched = bounded(self.launcher.launch(&handle.config), deadline, limit, cancel).await;
        let connection = match launched {
            Ok(connection) => connection,
            Err(e) => {
                self.logger.warn(&format!("[ToolServerManager] Server '{}' failed to start: {}", id, e));
                handle.inner.write().fail(&e);
                guard.settle();
                return Ok(false);
            }
        };
        guard.connection = Some(connection.clone());

        match bounded(connection.list_tools(), deadline, limit, cancel).await {
            Ok(tools) => {
                let tools = normalize_tools(tools);
                self.logger.info(&format!(
                    "[ToolServerManager] Server '{}' connected with {} tools",
                    id,
                    tools.len()
                ));
                let mut inner = handle.inner.write();
                self.transition(id, &mut inner, LifecycleEvent::Discovered);
                inner.tools = tools;
                inner.connection = Some(connection);
                guard.settle();
                Ok(true)
            }
            Err(e) => {
                self.logger.warn(&format!("[ToolServerManager] Discovery for '{}' failed: {}", id, e));
                handle.inner.write().fail(&e);
                guard.settle();
                connection.shutdown().await;
                Ok(false)
            }
        }
    }

    fn transition(&self, id: &str, inner: &mut HandleState, event: LifecycleEvent) {
        if !inner.apply(event) {
            self.logger.warn(&format!(
                "[ToolServerManager] Server '{}' ignored {:?} while {}",
                id, event, inner.state
            ));
        }
    }

    /// Terminate a server's process; `false` only for an unknown id
    pub async fn stop_server(&self, id: &str) -> bool {
        let Ok(handle) = self.handle(id) else {
            return false;
        };
        let _lifecycle = handle.lifecycle.lock().await;
        self.stop_locked(&handle).await;
        true
    }

    /// Caller holds the lifecycle lock
    async fn stop_locked(&self, handle: &ServerHandle) {
        let connection = {
            let mut inner = handle.inner.write();
            self.transition(&handle.config.id, &mut inner, LifecycleEvent::Stop);
            inner.tools.clear();
            inner.last_error = None;
            inner.connection.take()
        };
        if let Some(connection) = connection {
            self.logger.info(&format!("[ToolServerManager] Stopping server '{}'", handle.config.id));
            connection.shutdown().await;
        }
    }

    /// Stop and unregister a server; unknown ids are ignored
    pub async fn remove_server(&self, id: &str) {
        let Ok(handle) = self.handle(id) else {
            return;
        };
        let _lifecycle = handle.lifecycle.lock().await;
        self.stop_locked(&handle).await;
        handle.inner.write().removed = true;

        let mut servers = self.servers.write();
        if servers.get(id).is_some_and(|current| Arc::ptr_eq(current, &handle)) {
            servers.remove(id);
            self.logger.info(&format!("[ToolServerManager] Removed server '{}'", id));
        }
    }

    /// Re-run discovery on the running process
    ///
    /// A handle without a live process returns `false` unchanged. A failed
    /// discovery moves the handle to `Error` but keeps the process.
    pub async fn refresh_server(&self, id: &str) -> ServerResult<bool> {
        let handle = self.handle(id)?;
        let _lifecycle = handle.lifecycle.lock().await;

        let connection = {
            let inner = handle.inner.read();
            if inner.removed {
                return Err(ServerError::UnknownId(id.to_string()));
            }
            inner.connection.clone()
        };
        let Some(connection) = connection else {
            return Ok(false);
        };

        let limit = self.settings.discovery_timeout();
        let result = bounded(
            connection.list_tools(),
            Instant::now() + limit,
            limit,
            &CancellationToken::new(),
        )
        .await;

        let mut inner = handle.inner.write();
        match result {
            Ok(tools) => {
                self.transition(id, &mut inner, LifecycleEvent::Discovered);
                inner.tools = normalize_tools(tools);
                inner.last_error = None;
                self.logger.info(&format!(
                    "[ToolServerManager] Refreshed '{}': {} tools",
                    id,
                    inner.tools.len()
                ));
                Ok(true)
            }
            Err(e) => {
                self.logger.warn(&format!("[ToolServerManager] Refresh of '{}' failed: {}", id, e));
                self.transition(id, &mut inner, LifecycleEvent::Failed);
                inner.tools.clear();
                inner.last_error = Some(e.to_string());
                Ok(false)
            }
        }
    }

    /// Status of every handle, in registration order
    pub fn get_servers_status(&self) -> Vec<ServerStatus> {
        self.handles().iter().map(|h| h.status()).collect()
    }

    /// Catalog of connected servers' tools followed by the built-ins
    pub fn get_all_tools(&self) -> Vec<CallableTool> {
        let servers: Vec<ServerTools> = self
            .handles()
            .iter()
            .filter_map(|handle| {
                let inner = handle.inner.read();
                inner.state.is_connected().then(|| ServerTools {
                    server_id: handle.config.id.clone(),
                    server_name: handle.config.name.clone(),
                    tools: inner.tools.clone(),
                })
            })
            .collect();

        build_catalog(&servers, &self.builtin_descriptors(), self.settings.catalog_options())
    }

    fn builtin_descriptors(&self) -> Vec<ToolDescriptor> {
        if !self.settings.builtin_tools {
            return vec![];
        }
        self.builtins.iter().map(|b| b.descriptor()).collect()
    }

    /// Invoke a catalog tool; every failure becomes an error result
    pub async fn call_tool(&self, call: &ToolCall) -> ToolResult {
        let catalog = self.get_all_tools();
        let Some(entry) = resolve(&catalog, &call.name) else {
            return ToolResult::error(&call.id, format!("Unknown tool: {}", call.name));
        };

        self.logger.debug(&format!("[ToolServerManager] Calling tool '{}'", call.name));
        match &entry.origin {
            ToolOrigin::Builtin => self.call_builtin(call).await,
            ToolOrigin::Server { server_id, tool_name } => {
                match self.call_server_tool(server_id, tool_name, call.input.clone()).await {
                    Ok(output) => ToolResult {
                        call_id: call.id.clone(),
                        content: output.content,
                        is_error: output.is_error,
                    },
                    Err(e) => ToolResult::error(&call.id, format!("Error: {}", e)),
                }
            }
        }
    }

    /// Invoke several calls in order
    pub async fn call_tools(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.call_tool(call).await);
        }
        results
    }

    async fn call_builtin(&self, call: &ToolCall) -> ToolResult {
        let builtin = self.builtins.iter().find(|b| b.descriptor().name == call.name);
        match builtin {
            Some(builtin) => match builtin.call(call.input.clone()).await {
                Ok(text) => ToolResult::success(&call.id, text),
                Err(e) => ToolResult::error(&call.id, format!("Error: {}", e)),
            },
            None => ToolResult::error(&call.id, format!("Unknown tool: {}", call.name)),
        }
    }

    async fn call_server_tool(
        &self,
        server_id: &str,
        tool_name: &str,
        arguments: Value,
    ) -> ServerResult<ToolOutput> {
        let handle = self.handle(server_id)?;
        let connection = {
            let inner = handle.inner.read();
            match (&inner.connection, inner.state.is_connected()) {
                (Some(connection), true) => connection.clone(),
                _ => return Err(ServerError::NotConnected(server_id.to_string())),
            }
        };

        let limit = self.settings.tool_call_timeout();
        match tokio::time::timeout(limit, connection.call_tool(tool_name, arguments)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e @ ServerError::Transport(_))) => {
                self.logger.error(&format!(
                    "[ToolServerManager] Lost '{}' while calling '{}': {}",
                    server_id, tool_name, e
                ));
                self.mark_failed(&handle, &connection, &e).await;
                Err(e)
            }
            Ok(Err(e)) => {
                self.logger.warn(&format!(
                    "[ToolServerManager] Tool '{}' on '{}' failed: {}",
                    tool_name, server_id, e
                ));
                Err(e)
            }
            Err(_) => Err(ServerError::ToolCall(format!("timed out after {:?}", limit))),
        }
    }

    /// Move a handle to `Error` and terminate its process, unless it was restarted meanwhile
    async fn mark_failed(&self, handle: &ServerHandle, failed: &Arc<dyn ServerConnection>, error: &ServerError) {
        let _lifecycle = handle.lifecycle.lock().await;
        let connection = {
            let mut inner = handle.inner.write();
            let same = inner.connection.as_ref().is_some_and(|c| Arc::ptr_eq(c, failed));
            if !same {
                return;
            }
            inner.fail(error)
        };
        if let Some(connection) = connection {
            connection.shutdown().await;
        }
    }

    /// Probe every connected server with a bounded discovery call
    ///
    /// Servers that fail move to `Error` and are terminated. Returns their ids.
    pub async fn check_health(&self) -> Vec<String> {
        let probes = self
            .handles()
            .into_iter()
            .filter(|h| h.inner.read().state.is_connected())
            .map(|handle| async move {
                let healthy = self.probe(&handle).await;
                (handle.config.id.clone(), healthy)
            });

        let failed: Vec<String> = join_all(probes)
            .await
            .into_iter()
            .filter_map(|(id, healthy)| (!healthy).then_some(id))
            .collect();

        if !failed.is_empty() {
            self.logger.warn(&format!("[ToolServerManager] Unhealthy servers: {}", failed.join(", ")));
        }
        failed
    }

    async fn probe(&self, handle: &ServerHandle) -> bool {
        let _lifecycle = handle.lifecycle.lock().await;
        let connection = {
            let inner = handle.inner.read();
            match (&inner.connection, inner.state.is_connected()) {
                (Some(connection), true) => connection.clone(),
                // Stopped or failed while waiting for the lock
                _ => return true,
            }
        };

        let limit = self.settings.discovery_timeout();
        let result = bounded(
            connection.list_tools(),
            Instant::now() + limit,
            limit,
            &CancellationToken::new(),
        )
        .await;

        match result {
            Ok(tools) => {
                handle.inner.write().tools = normalize_tools(tools);
                true
            }
            Err(e) => {
                let taken = handle.inner.write().fail(&e);
                if let Some(connection) = taken {
                    connection.shutdown().await;
                }
                false
            }
        }
    }

    /// Stop every server, keeping the handles registered; built-in state is cleared
    pub async fn shutdown(&self) {
        for handle in self.handles() {
            let _lifecycle = handle.lifecycle.lock().await;
            self.stop_locked(&handle).await;
        }
        for builtin in &self.builtins {
            builtin.reset();
        }
    }
}

impl std::fmt::Debug for ToolServerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServerManager")
            .field("servers", &self.servers.read().len())
            .field("builtins", &self.builtins.len())
            .field("settings", &self.settings)
            .finish()
    }
}
