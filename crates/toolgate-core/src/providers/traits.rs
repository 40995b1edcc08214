//! Provider transport seam and request/response types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::TransportError;
use crate::types::{CallableTool, ProviderKind, ToolCall, ToolChoice};

/// Options for a single `send_message` call
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Catalog tools offered to the model
    pub tools: Vec<CallableTool>,
    pub tool_choice: Option<ToolChoice>,
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Stop sequences
    pub stop: Vec<String>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(mut self, tools: Vec<CallableTool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    ContentFilter,
    Other(String),
}

/// Provider-agnostic result of `send_message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Concatenated text output
    pub content: String,
    /// Requested tool invocations, named by catalog (qualified) name
    #[serde(rename = "toolCalls")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(rename = "stopReason")]
    pub stop_reason: Option<StopReason>,
    /// Untranslated provider payload
    pub raw: Value,
}

/// A provider-shaped request body and where it goes
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub kind: ProviderKind,
    /// Model id as the provider knows it
    pub model: String,
    pub body: Value,
}

/// Performs exactly one call against a provider backend
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<Value, TransportError>;
}
