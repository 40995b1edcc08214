//! Translation between normalized messages and provider wire shapes
//!
//! ```text
//!  ChatMessage[] + SendOptions ──encode_request──▶ provider JSON ──▶ transport
//!                                                                     │
//!  ProviderResponse ◀──────────decode_response──── provider JSON ◀────┘
//! ```
//!
//! Catalog names travel through a [`ToolNameMap`] in both directions.

mod anthropic;
mod gemini;
mod names;
mod openai;

pub use names::{sanitize, ToolNameMap, MAX_WIRE_NAME_LEN};

use serde_json::Value;

use super::error::{GatewayError, GatewayResult};
use super::traits::{ProviderResponse, SendOptions, StopReason};
use crate::types::{parse_data_url, ChatMessage, ContentPart, MessageRole, ProviderKind, ToolCall};

/// Wire protocol family spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Chat completions
    OpenAi,
    /// Messages API
    Anthropic,
    /// generateContent
    Gemini,
}

impl Dialect {
    pub fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Anthropic => Dialect::Anthropic,
            ProviderKind::Gemini => Dialect::Gemini,
            ProviderKind::OpenAi
            | ProviderKind::Ollama
            | ProviderKind::OpenRouter
            | ProviderKind::Mistral
            | ProviderKind::Groq
            | ProviderKind::Mock => Dialect::OpenAi,
        }
    }

    /// System prompts go in a dedicated top-level field rather than the message list
    pub fn has_system_field(self) -> bool {
        match self {
            Dialect::OpenAi => false,
            Dialect::Anthropic | Dialect::Gemini => true,
        }
    }

    /// Check the request shape; nothing is sent when this fails
    pub fn validate(self, messages: &[ChatMessage]) -> GatewayResult<()> {
        if messages.is_empty() {
            return Err(GatewayError::invalid_request("at least one message is required"));
        }

        let mut seen_non_system = false;
        for (i, message) in messages.iter().enumerate() {
            if message.role == MessageRole::System {
                if seen_non_system && self.has_system_field() {
                    return Err(GatewayError::invalid_request(format!(
                        "system message at position {} follows a non-system message",
                        i
                    )));
                }
            } else {
                seen_non_system = true;
            }

            if message.role == MessageRole::Tool {
                let parts = message.content.parts();
                if parts.is_empty() || !parts.iter().all(|p| matches!(p, ContentPart::ToolResult { .. })) {
                    return Err(GatewayError::invalid_request(format!(
                        "tool message at position {} must carry only tool-result parts",
                        i
                    )));
                }
            }

            for part in message.content.parts() {
                check_part(message.role, part, i)?;
            }
        }

        if !seen_non_system && self.has_system_field() {
            return Err(GatewayError::invalid_request("at least one non-system message is required"));
        }

        Ok(())
    }

    /// Build the provider request body
    ///
    /// A message whose only part is text is sent as plain text, so every
    /// dialect reads it back as [`MessageContent::Text`](crate::types::MessageContent::Text).
    pub fn encode_request(
        self,
        model: &str,
        messages: &[ChatMessage],
        options: &SendOptions,
        names: &ToolNameMap,
    ) -> GatewayResult<Value> {
        let messages: Vec<ChatMessage> = messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: m.content.normalized(),
            })
            .collect();
        match self {
            Dialect::OpenAi => Ok(openai::encode_request(model, &messages, options, names)),
            Dialect::Anthropic => Ok(anthropic::encode_request(model, &messages, options, names)),
            Dialect::Gemini => gemini::encode_request(&messages, options, names),
        }
    }

    /// Translate a provider response; the error is a description of what is malformed
    pub fn decode_response(self, raw: Value, names: &ToolNameMap) -> Result<ProviderResponse, String> {
        let decoded = match self {
            Dialect::OpenAi => openai::decode_response(&raw, names)?,
            Dialect::Anthropic => anthropic::decode_response(&raw, names)?,
            Dialect::Gemini => gemini::decode_response(&raw, names)?,
        };

        Ok(ProviderResponse {
            content: decoded.content,
            tool_calls: decoded.tool_calls,
            stop_reason: decoded.stop_reason,
            raw,
        })
    }

    /// Read the conversation back out of a request body produced by [`Dialect::encode_request`]
    pub fn decode_messages(self, body: &Value, names: &ToolNameMap) -> Result<Vec<ChatMessage>, String> {
        match self {
            Dialect::OpenAi => openai::decode_messages(body, names),
            Dialect::Anthropic => anthropic::decode_messages(body, names),
            Dialect::Gemini => gemini::decode_messages(body, names),
        }
    }

    /// Build a success payload in this dialect; tool call names are used as given
    pub fn encode_response(self, content: &str, tool_calls: &[ToolCall]) -> Value {
        match self {
            Dialect::OpenAi => openai::encode_response(content, tool_calls),
            Dialect::Anthropic => anthropic::encode_response(content, tool_calls),
            Dialect::Gemini => gemini::encode_response(content, tool_calls),
        }
    }
}

/// Response fields shared by every dialect
struct Decoded {
    content: String,
    tool_calls: Vec<ToolCall>,
    stop_reason: Option<StopReason>,
}

fn check_part(role: MessageRole, part: &ContentPart, position: usize) -> GatewayResult<()> {
    let problem = match part {
        ContentPart::Text { .. } => None,
        ContentPart::Image { .. } if role != MessageRole::User => Some("images are only allowed in user messages"),
        ContentPart::Image { image_url } => {
            let supported = image_url.starts_with("http://")
                || image_url.starts_with("https://")
                || parse_data_url(image_url).is_some();
            (!supported).then_some("images must be http(s) or base64 data URLs")
        }
        ContentPart::ToolUse { .. } if role != MessageRole::Assistant => {
            Some("tool-use parts are only allowed in assistant messages")
        }
        ContentPart::ToolUse { .. } => None,
        ContentPart::ToolResult { .. } if role != MessageRole::Tool => {
            Some("tool-result parts are only allowed in tool messages")
        }
        ContentPart::ToolResult { .. } => None,
    };

    match problem {
        Some(problem) => Err(GatewayError::invalid_request(format!("message {}: {}", position, problem))),
        None => Ok(()),
    }
}

/// Concatenated `text` fields of a list of blocks
fn joined_block_text(blocks: &[Value]) -> String {
    blocks
        .iter()
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}

/// Tool arguments, accepting a JSON string, an object, or nothing
fn parse_arguments(name: &str, arguments: Option<&Value>) -> Result<Value, String> {
    match arguments {
        None | Some(Value::Null) => Ok(Value::Object(Default::default())),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Value::Object(Default::default())),
        Some(Value::String(s)) => {
            serde_json::from_str(s).map_err(|e| format!("tool call '{}' has malformed arguments: {}", name, e))
        }
        Some(other) => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallableTool, ToolOrigin};
    use serde_json::json;

    fn calc_tool() -> CallableTool {
        CallableTool {
            name: "calc:add".to_string(),
            description: "[calc] Add two numbers".to_string(),
            input_schema: json!({
                "$schema": "http://json-schema.org/draft-07/schema#",
                "type": "object",
                "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                "required": ["a", "b"],
                "additionalProperties": false
            }),
            origin: ToolOrigin::Server {
                server_id: "calc".to_string(),
                tool_name: "add".to_string(),
            },
        }
    }

    /// A conversation in the canonical shape every dialect reproduces exactly
    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("You are a calculator"),
            ChatMessage::user("What is 1 + 2?"),
            ChatMessage::with_parts(
                MessageRole::Assistant,
                vec![
                    ContentPart::text("Let me add that."),
                    ContentPart::tool_use("call_1", "calc:add", json!({"a": 1, "b": 2})),
                ],
            ),
            ChatMessage::tool_result("call_1", "3"),
            ChatMessage::assistant("The answer is 3."),
            ChatMessage::with_parts(
                MessageRole::User,
                vec![
                    ContentPart::text("And this one?"),
                    ContentPart::image("data:image/png;base64,iVBORw0KGgo="),
                    ContentPart::image("https://example.com/sum.png"),
                ],
            ),
            ChatMessage::with_parts(
                MessageRole::Assistant,
                vec![
                    ContentPart::tool_use("call_2", "calc:add", json!({"a": 4, "b": 5})),
                    ContentPart::tool_use("call_3", "calc:add", json!({"a": 6, "b": 7})),
                ],
            ),
            ChatMessage::with_parts(
                MessageRole::Tool,
                vec![ContentPart::tool_result("call_2", "9"), ContentPart::tool_result("call_3", "13")],
            ),
            ChatMessage::assistant("9 and 13."),
        ]
    }

    const ALL: [Dialect; 3] = [Dialect::OpenAi, Dialect::Anthropic, Dialect::Gemini];

    #[test]
    fn test_dialect_for_kind() {
        assert_eq!(Dialect::for_kind(ProviderKind::Anthropic), Dialect::Anthropic);
        assert_eq!(Dialect::for_kind(ProviderKind::Gemini), Dialect::Gemini);
        for kind in [ProviderKind::OpenAi, ProviderKind::Groq, ProviderKind::Ollama, ProviderKind::Mock] {
            assert_eq!(Dialect::for_kind(kind), Dialect::OpenAi);
        }
    }

    #[test]
    fn test_messages_round_trip() {
        let messages = conversation();
        let options = SendOptions::new().with_tools(vec![calc_tool()]);
        let names = ToolNameMap::for_request(&messages, &options.tools);

        for dialect in ALL {
            let body = dialect.encode_request("model-x", &messages, &options, &names).unwrap();
            let decoded = dialect.decode_messages(&body, &names).unwrap();
            assert_eq!(decoded, messages, "{:?}", dialect);
        }
    }

    #[test]
    fn test_single_text_part_reads_back_as_text() {
        let messages = vec![
            ChatMessage::with_parts(MessageRole::User, vec![ContentPart::text("hi")]),
            ChatMessage::with_parts(MessageRole::Assistant, vec![ContentPart::text("hello")]),
        ];
        let names = ToolNameMap::default();

        for dialect in ALL {
            let body = dialect.encode_request("model-x", &messages, &SendOptions::new(), &names).unwrap();
            let decoded = dialect.decode_messages(&body, &names).unwrap();
            assert_eq!(decoded, vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")], "{:?}", dialect);
        }
    }

    #[test]
    fn test_tool_names_are_provider_legal() {
        let messages = conversation();
        let options = SendOptions::new().with_tools(vec![calc_tool()]);
        let names = ToolNameMap::for_request(&messages, &options.tools);

        for dialect in ALL {
            let body = dialect.encode_request("model-x", &messages, &options, &names).unwrap();
            let text = body.to_string();
            assert!(text.contains("calc__add"), "{:?}", dialect);
            assert!(!text.contains("calc:add"), "{:?}", dialect);
        }
    }

    #[test]
    fn test_response_round_trip() {
        let names = ToolNameMap::new(["calc:add"]);
        let calls = vec![ToolCall::new("call_9", "calc__add", json!({"a": 2, "b": 5}))];

        for dialect in ALL {
            let raw = dialect.encode_response("Adding.", &calls);
            let response = dialect.decode_response(raw.clone(), &names).unwrap();
            assert_eq!(response.content, "Adding.");
            assert_eq!(response.tool_calls, vec![ToolCall::new("call_9", "calc:add", json!({"a": 2, "b": 5}))]);
            assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
            assert_eq!(response.raw, raw);

            let raw = dialect.encode_response("Done", &[]);
            let response = dialect.decode_response(raw, &names).unwrap();
            assert_eq!(response.content, "Done");
            assert!(response.tool_calls.is_empty());
            assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        }
    }

    #[test]
    fn test_malformed_responses() {
        let names = ToolNameMap::default();
        for dialect in ALL {
            assert!(dialect.decode_response(json!({"unexpected": true}), &names).is_err());
            assert!(dialect.decode_response(json!("text"), &names).is_err());
        }
    }

    #[test]
    fn test_late_system_message() {
        let messages = vec![ChatMessage::user("hi"), ChatMessage::system("be brief")];

        assert!(Dialect::OpenAi.validate(&messages).is_ok());
        for dialect in [Dialect::Anthropic, Dialect::Gemini] {
            let err = dialect.validate(&messages).unwrap_err();
            assert_eq!(err.kind(), "invalid_request");
        }
    }

    #[test]
    fn test_tool_message_shape() {
        let empty_tool = ChatMessage::with_parts(MessageRole::Tool, vec![]);
        let text_tool = ChatMessage {
            role: MessageRole::Tool,
            content: "3".into(),
        };
        let stray_result = ChatMessage::with_parts(MessageRole::User, vec![ContentPart::tool_result("c", "3")]);
        let stray_use = ChatMessage::with_parts(
            MessageRole::User,
            vec![ContentPart::tool_use("c", "calc:add", json!({}))],
        );

        for dialect in ALL {
            for bad in [&empty_tool, &text_tool, &stray_result, &stray_use] {
                let messages = vec![ChatMessage::user("hi"), bad.clone()];
                assert!(dialect.validate(&messages).is_err(), "{:?} {:?}", dialect, bad);
            }
            assert!(dialect.validate(&[]).is_err());
        }
    }

    #[test]
    fn test_image_validation() {
        let bad_url = ChatMessage::with_parts(MessageRole::User, vec![ContentPart::image("ftp://host/cat.png")]);
        let assistant_image = ChatMessage::with_parts(
            MessageRole::Assistant,
            vec![ContentPart::image("https://example.com/cat.png")],
        );
        assert!(Dialect::OpenAi.validate(&[bad_url]).is_err());
        assert!(Dialect::OpenAi
            .validate(&[ChatMessage::user("hi"), assistant_image])
            .is_err());
    }

    #[test]
    fn test_only_system_messages() {
        let messages = vec![ChatMessage::system("rules")];
        assert!(Dialect::OpenAi.validate(&messages).is_ok());
        assert!(Dialect::Anthropic.validate(&messages).is_err());
        assert!(Dialect::Gemini.validate(&messages).is_err());
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments("t", None).unwrap(), json!({}));
        assert_eq!(parse_arguments("t", Some(&json!(""))).unwrap(), json!({}));
        assert_eq!(parse_arguments("t", Some(&json!("{\"a\":1}"))).unwrap(), json!({"a": 1}));
        assert_eq!(parse_arguments("t", Some(&json!({"a": 1}))).unwrap(), json!({"a": 1}));
        assert!(parse_arguments("t", Some(&json!("{oops"))).is_err());
    }
}
