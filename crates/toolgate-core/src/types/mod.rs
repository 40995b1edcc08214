//! Core types shared by the tool server manager and the provider gateway

mod cancellation;
mod message;
mod model;
mod server;
mod tool;

pub use cancellation::CancellationToken;
pub use message::{data_url, parse_data_url, ChatMessage, ContentPart, MessageContent, MessageRole};
pub use model::{ModelCapability, ModelDescriptor, ProviderConfig, ProviderKind};
pub use server::{ConnectionState, LifecycleEvent, ServerConfig, ServerStatus};
pub use tool::{
    empty_object_schema, normalize_schema, CallableTool, ToolCall, ToolChoice, ToolDescriptor, ToolOrigin,
    ToolResult,
};
