//! Messages API dialect

use serde_json::{json, Value};

use super::{joined_block_text, Decoded, ToolNameMap};
use crate::providers::traits::{SendOptions, StopReason};
use crate::types::{data_url, parse_data_url, ChatMessage, ContentPart, MessageContent, MessageRole, ToolCall, ToolChoice};

/// `max_tokens` is mandatory for this API
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

pub(super) fn encode_request(model: &str, messages: &[ChatMessage], options: &SendOptions, names: &ToolNameMap) -> Value {
    let mut system = Vec::new();
    let mut wire = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role {
            MessageRole::System => system.push(json!({ "type": "text", "text": message.content.joined_text() })),
            MessageRole::User => wire.push(json!({ "role": "user", "content": encode_content(&message.content, names) })),
            MessageRole::Assistant => {
                wire.push(json!({ "role": "assistant", "content": encode_content(&message.content, names) }))
            }
            // Results travel as user turns
            MessageRole::Tool => wire.push(json!({ "role": "user", "content": encode_blocks(message.content.parts(), names) })),
        }
    }

    let mut body = json!({
        "model": model,
        "max_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "messages": wire,
    });

    if !system.is_empty() {
        body["system"] = Value::Array(system);
    }

    if !options.tools.is_empty() {
        let tools: Vec<Value> = options
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "name": names.to_wire(&tool.name),
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect();
        body["tools"] = Value::Array(tools);

        if let Some(choice) = options.tool_choice {
            let kind = match choice {
                ToolChoice::Auto => "auto",
                ToolChoice::None => "none",
                ToolChoice::Required => "any",
            };
            body["tool_choice"] = json!({ "type": kind });
        }
    }

    if let Some(temperature) = options.temperature {
        body["temperature"] = json!(temperature);
    }
    if !options.stop.is_empty() {
        body["stop_sequences"] = json!(options.stop);
    }

    body
}

fn encode_content(content: &MessageContent, names: &ToolNameMap) -> Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::Parts(parts) => encode_blocks(parts, names),
    }
}

fn encode_blocks(parts: &[ContentPart], names: &ToolNameMap) -> Value {
    Value::Array(
        parts
            .iter()
            .map(|part| match part {
                ContentPart::Text { text } => json!({ "type": "text", "text": text }),
                ContentPart::Image { image_url } => match parse_data_url(image_url) {
                    Some((mime, data)) => json!({
                        "type": "image",
                        "source": { "type": "base64", "media_type": mime, "data": data },
                    }),
                    None => json!({ "type": "image", "source": { "type": "url", "url": image_url } }),
                },
                ContentPart::ToolUse { id, name, input } => json!({
                    "type": "tool_use",
                    "id": id,
                    "name": names.to_wire(name),
                    "input": input,
                }),
                ContentPart::ToolResult { tool_use_id, content } => json!({
                    "type": "tool_result",
                    "tool_use_id": tool_use_id,
                    "content": content,
                }),
            })
            .collect(),
    )
}

pub(super) fn decode_messages(body: &Value, names: &ToolNameMap) -> Result<Vec<ChatMessage>, String> {
    let mut messages = match body.get("system") {
        None => vec![],
        Some(Value::String(text)) => vec![ChatMessage::system(text.clone())],
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .map(ChatMessage::system)
            .collect(),
        Some(_) => return Err("system must be a string or a list of blocks".to_string()),
    };

    let items = body
        .get("messages")
        .and_then(Value::as_array)
        .ok_or("request has no messages array")?;

    for item in items {
        let role = match item.get("role").and_then(Value::as_str) {
            Some("user") => MessageRole::User,
            Some("assistant") => MessageRole::Assistant,
            other => return Err(format!("unknown role {:?}", other)),
        };

        let message = match item.get("content") {
            Some(Value::String(text)) => ChatMessage {
                role,
                content: MessageContent::Text(text.clone()),
            },
            Some(Value::Array(blocks)) => {
                let parts = blocks.iter().map(|b| decode_block(b, names)).collect::<Result<Vec<_>, _>>()?;
                let all_results =
                    !parts.is_empty() && parts.iter().all(|p| matches!(p, ContentPart::ToolResult { .. }));
                let role = if role == MessageRole::User && all_results { MessageRole::Tool } else { role };
                ChatMessage::with_parts(role, parts)
            }
            _ => return Err(format!("{} message has no content", role)),
        };
        messages.push(message);
    }

    Ok(messages)
}

fn decode_block(block: &Value, names: &ToolNameMap) -> Result<ContentPart, String> {
    let field = |key: &str| block.get(key).and_then(Value::as_str).unwrap_or_default();

    match field("type") {
        "text" => Ok(ContentPart::text(field("text"))),
        "image" => {
            let source = block.get("source").ok_or("image block has no source")?;
            let get = |key: &str| source.get(key).and_then(Value::as_str).unwrap_or_default();
            match get("type") {
                "base64" => Ok(ContentPart::image(data_url(get("media_type"), get("data")))),
                "url" => Ok(ContentPart::image(get("url"))),
                other => Err(format!("unknown image source '{}'", other)),
            }
        }
        "tool_use" => Ok(ContentPart::tool_use(
            field("id"),
            names.from_wire(field("name")),
            block.get("input").cloned().unwrap_or_else(|| json!({})),
        )),
        "tool_result" => {
            let content = match block.get("content") {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Array(blocks)) => joined_block_text(blocks),
                _ => String::new(),
            };
            Ok(ContentPart::tool_result(field("tool_use_id"), content))
        }
        other => Err(format!("unknown content block '{}'", other)),
    }
}

pub(super) fn decode_response(raw: &Value, names: &ToolNameMap) -> Result<Decoded, String> {
    let blocks = raw
        .get("content")
        .and_then(Value::as_array)
        .ok_or("response has no content blocks")?;

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => content.push_str(block.get("text").and_then(Value::as_str).unwrap_or_default()),
            Some("tool_use") => {
                let id = block.get("id").and_then(Value::as_str).ok_or("tool_use block has no id")?;
                let name = block.get("name").and_then(Value::as_str).ok_or("tool_use block has no name")?;
                let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                tool_calls.push(ToolCall::new(id, names.from_wire(name), input));
            }
            // thinking and other block types carry no output
            _ => {}
        }
    }

    let stop_reason = raw.get("stop_reason").and_then(Value::as_str).map(|reason| match reason {
        "end_turn" => StopReason::EndTurn,
        "tool_use" => StopReason::ToolUse,
        "max_tokens" => StopReason::MaxTokens,
        "stop_sequence" => StopReason::StopSequence,
        "refusal" => StopReason::ContentFilter,
        other => StopReason::Other(other.to_string()),
    });

    Ok(Decoded {
        content,
        tool_calls,
        stop_reason,
    })
}

pub(super) fn encode_response(content: &str, tool_calls: &[ToolCall]) -> Value {
    let mut blocks = Vec::new();
    if !content.is_empty() {
        blocks.push(json!({ "type": "text", "text": content }));
    }
    for call in tool_calls {
        blocks.push(json!({ "type": "tool_use", "id": call.id, "name": call.name, "input": call.input }));
    }

    let stop_reason = if tool_calls.is_empty() { "end_turn" } else { "tool_use" };
    json!({
        "type": "message",
        "role": "assistant",
        "content": blocks,
        "stop_reason": stop_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_hoisted() {
        let messages = vec![
            ChatMessage::system("rule one"),
            ChatMessage::system("rule two"),
            ChatMessage::user("hi"),
        ];
        let body = encode_request("claude-3-5-sonnet", &messages, &SendOptions::new(), &ToolNameMap::default());

        assert_eq!(
            body["system"],
            json!([{"type": "text", "text": "rule one"}, {"type": "text", "text": "rule two"}])
        );
        assert_eq!(body["messages"], json!([{"role": "user", "content": "hi"}]));
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_tool_results_share_one_user_turn() {
        let message = ChatMessage::with_parts(
            MessageRole::Tool,
            vec![ContentPart::tool_result("a", "1"), ContentPart::tool_result("b", "2")],
        );
        let body = encode_request(
            "claude",
            &[ChatMessage::user("go"), message.clone()],
            &SendOptions::new(),
            &ToolNameMap::default(),
        );

        let wire = body["messages"].as_array().unwrap();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[1]["content"][1]["tool_use_id"], "b");

        let decoded = decode_messages(&body, &ToolNameMap::default()).unwrap();
        assert_eq!(decoded[1], message);
    }

    #[test]
    fn test_tool_choice_mapping() {
        let tool = crate::types::CallableTool {
            name: "calc:add".to_string(),
            description: "[calc] Add".to_string(),
            input_schema: json!({"type": "object", "properties": {}}),
            origin: crate::types::ToolOrigin::Builtin,
        };
        let options = SendOptions::new()
            .with_tools(vec![tool])
            .with_tool_choice(ToolChoice::Required)
            .with_max_tokens(100);
        let names = ToolNameMap::new(["calc:add"]);
        let body = encode_request("claude", &[ChatMessage::user("hi")], &options, &names);

        assert_eq!(body["tool_choice"], json!({"type": "any"}));
        assert_eq!(body["tools"][0]["name"], "calc__add");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(body["max_tokens"], 100);
    }

    #[test]
    fn test_decode_response_skips_thinking() {
        let raw = json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Hello"},
                {"type": "text", "text": " there"}
            ],
            "stop_reason": "max_tokens"
        });
        let decoded = decode_response(&raw, &ToolNameMap::default()).unwrap();
        assert_eq!(decoded.content, "Hello there");
        assert_eq!(decoded.stop_reason, Some(StopReason::MaxTokens));
    }
}
