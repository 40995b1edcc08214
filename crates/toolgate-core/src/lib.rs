//! Toolgate Core
//!
//! Tool server orchestration and provider routing for LLM backends.
//!
//! ## Tool servers
//!
//! The `servers` module spawns tool servers as child processes (MCP over stdio),
//! discovers their tools and keeps each one in a four-state lifecycle. The `tools`
//! module merges what connected servers expose, plus built-ins, into one catalog
//! with namespaced names (`calc:add`).
//!
//! ## Providers
//!
//! The `providers` module translates one normalized conversation format into the
//! OpenAI, Anthropic and Gemini wire shapes and routes each request to a single
//! transport picked from the model descriptor.
//!
//! ```rust,ignore
//! use toolgate_core::{Orchestrator, ServerConfig, McpLauncher, EnvSecretStore, FileConfigProvider};
//!
//! let config = FileConfigProvider::user();
//! let orchestrator = Orchestrator::from_config(&config, launcher, secrets, logger).await;
//! let report = orchestrator.load_servers(&config).await;
//!
//! let response = orchestrator
//!     .send_message_with_tools(&messages, &model, SendOptions::new(), &cancel)
//!     .await?;
//! let results = orchestrator.call_tools(&response.tool_calls).await;
//! ```

pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod providers;
pub mod secrets;
pub mod servers;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use types::{
    CallableTool, CancellationToken, ChatMessage, ConnectionState, ContentPart, MessageContent, MessageRole,
    ModelCapability, ModelDescriptor, ProviderConfig, ProviderKind, ServerConfig, ServerStatus, ToolCall, ToolChoice,
    ToolDescriptor, ToolOrigin, ToolResult,
};

pub use secrets::{ChainSecretStore, EnvSecretStore, MemorySecretStore, SecretStore, SecretStoreError, SecretStoreResult};

pub use logging::{ConsoleLogger, Logger, NoOpLogger, SharedLogger, TracingLogger};

pub use config::{ConfigError, ConfigProvider, FileConfigProvider, MemoryConfigProvider, OrchestratorSettings};

pub use servers::{McpLauncher, ServerError, ServerLauncher, ServerResult, ToolServerManager};

pub use tools::{build_catalog, BuiltinTool, CatalogOptions, CollisionPolicy, NamingStyle};

pub use providers::{
    GatewayError, GatewayResult, HttpTransport, ProviderGateway, ProviderResponse, ProviderTransport, SendOptions,
};

pub use orchestrator::{AddServerOutcome, LoadReport, OperationOutcome, Orchestrator};
