//! Tool/function calling types

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Schema used when a server declares a tool without parameters
pub fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// One capability exposed by a tool server, as declared by that server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within its server
    pub name: String,
    /// Description of what the tool does
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Create a descriptor with an empty-object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
        }
    }

    /// Set the input schema; null or an empty object falls back to the empty-object schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = normalize_schema(schema);
        self
    }
}

/// Replace a missing or empty schema with the empty-object schema
pub fn normalize_schema(schema: Value) -> Value {
    match &schema {
        Value::Null => empty_object_schema(),
        Value::Object(map) if map.is_empty() => empty_object_schema(),
        _ => schema,
    }
}

/// Where a catalog entry comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolOrigin {
    /// Declared by a tool server
    Server {
        #[serde(rename = "serverId")]
        server_id: String,
        /// Name as declared by the server (unqualified)
        #[serde(rename = "toolName")]
        tool_name: String,
    },
    /// Defined by the orchestrator itself
    Builtin,
}

/// A tool as exposed in the catalog handed to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallableTool {
    /// Fully qualified name (e.g. `calc:add`)
    pub name: String,
    /// Description, including the origin server for server tools
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    pub origin: ToolOrigin,
}

impl CallableTool {
    pub fn is_builtin(&self) -> bool {
        matches!(self.origin, ToolOrigin::Builtin)
    }
}

/// Tool call requested by a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool being called (catalog name)
    pub name: String,
    /// Input arguments for the tool
    pub input: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Get an input argument by key
    pub fn get_arg(&self, key: &str) -> Option<&Value> {
        self.input.get(key)
    }
}

/// Tool result to send back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is responding to
    #[serde(rename = "callId")]
    pub call_id: String,
    /// The result content
    pub content: String,
    /// Whether this result represents an error
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: error.into(),
            is_error: true,
        }
    }
}

/// Tool choice option for requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Let the model decide whether to use tools
    #[default]
    Auto,
    /// Don't use tools
    None,
    /// Force tool use
    Required,
}
