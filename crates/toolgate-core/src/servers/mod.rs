//! Tool server lifecycle: spawning, discovery, health and invocation

mod error;
mod launcher;
mod manager;
mod mcp;
mod mock;

pub use error::{ServerError, ServerResult};
pub use launcher::{ServerConnection, ServerLauncher, ToolOutput};
pub use manager::ToolServerManager;
pub use mcp::{McpConnection, McpLauncher};
pub use mock::{MockLauncher, MockMode, MockServer};
