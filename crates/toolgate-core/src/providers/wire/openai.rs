//! Chat-completions dialect (OpenAI, OpenRouter, Mistral, Groq, Ollama)

use serde_json::{json, Value};

use super::{joined_block_text, parse_arguments, Decoded, ToolNameMap};
use crate::providers::traits::{SendOptions, StopReason};
use crate::types::{ChatMessage, ContentPart, MessageContent, MessageRole, ToolCall, ToolChoice};

pub(super) fn encode_request(model: &str, messages: &[ChatMessage], options: &SendOptions, names: &ToolNameMap) -> Value {
    let mut wire = Vec::with_capacity(messages.len());
    for message in messages {
        encode_message(message, names, &mut wire);
    }

    let mut body = json!({ "model": model, "messages": wire });

    if !options.tools.is_empty() {
        let tools: Vec<Value> = options
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": names.to_wire(&tool.name),
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    }
                })
            })
            .collect();
        body["tools"] = Value::Array(tools);

        if let Some(choice) = options.tool_choice {
            body["tool_choice"] = json!(match choice {
                ToolChoice::Auto => "auto",
                ToolChoice::None => "none",
                ToolChoice::Required => "required",
            });
        }
    }

    if let Some(temperature) = options.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = options.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if !options.stop.is_empty() {
        body["stop"] = json!(options.stop);
    }

    body
}

fn encode_message(message: &ChatMessage, names: &ToolNameMap, out: &mut Vec<Value>) {
    match message.role {
        MessageRole::System | MessageRole::User => out.push(json!({
            "role": message.role.to_string(),
            "content": encode_content(&message.content),
        })),
        MessageRole::Assistant => out.push(encode_assistant(&message.content, names)),
        // One wire message per result
        MessageRole::Tool => {
            for part in message.content.parts() {
                if let ContentPart::ToolResult { tool_use_id, content } = part {
                    out.push(json!({ "role": "tool", "tool_call_id": tool_use_id, "content": content }));
                }
            }
        }
    }
}

fn encode_content(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::Parts(parts) => Value::Array(
            parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(json!({ "type": "text", "text": text })),
                    ContentPart::Image { image_url } => {
                        Some(json!({ "type": "image_url", "image_url": { "url": image_url } }))
                    }
                    ContentPart::ToolUse { .. } | ContentPart::ToolResult { .. } => None,
                })
                .collect(),
        ),
    }
}

fn encode_assistant(content: &MessageContent, names: &ToolNameMap) -> Value {
    let parts = match content {
        MessageContent::Text(text) => return json!({ "role": "assistant", "content": text }),
        MessageContent::Parts(parts) => parts,
    };

    let mut texts = Vec::new();
    let mut calls = Vec::new();
    for part in parts {
        match part {
            ContentPart::Text { text } => texts.push(json!({ "type": "text", "text": text })),
            ContentPart::ToolUse { id, name, input } => calls.push(json!({
                "id": id,
                "type": "function",
                "function": { "name": names.to_wire(name), "arguments": input.to_string() },
            })),
            ContentPart::Image { .. } | ContentPart::ToolResult { .. } => {}
        }
    }

    let content = if texts.is_empty() { Value::Null } else { Value::Array(texts) };
    let mut message = json!({ "role": "assistant", "content": content });
    if !calls.is_empty() {
        message["tool_calls"] = Value::Array(calls);
    }
    message
}

pub(super) fn decode_messages(body: &Value, names: &ToolNameMap) -> Result<Vec<ChatMessage>, String> {
    let items = body
        .get("messages")
        .and_then(Value::as_array)
        .ok_or("request has no messages array")?;

    let mut messages: Vec<ChatMessage> = Vec::with_capacity(items.len());
    for item in items {
        let message = decode_message(item, names)?;
        match messages.last_mut() {
            // Consecutive tool entries answer the same assistant turn
            Some(last) if last.role == MessageRole::Tool && message.role == MessageRole::Tool => {
                if let (MessageContent::Parts(parts), MessageContent::Parts(more)) =
                    (&mut last.content, message.content)
                {
                    parts.extend(more);
                }
            }
            _ => messages.push(message),
        }
    }
    Ok(messages)
}

fn decode_message(item: &Value, names: &ToolNameMap) -> Result<ChatMessage, String> {
    let role = item.get("role").and_then(Value::as_str).unwrap_or_default();
    match role {
        "system" | "user" => {
            let role = if role == "system" { MessageRole::System } else { MessageRole::User };
            let content = match item.get("content") {
                Some(Value::String(text)) => MessageContent::Text(text.clone()),
                Some(Value::Array(parts)) => MessageContent::Parts(parts.iter().filter_map(decode_part).collect()),
                _ => return Err(format!("{} message has no content", role)),
            };
            Ok(ChatMessage { role, content })
        }
        "assistant" => {
            let calls = item.get("tool_calls").and_then(Value::as_array);
            match (item.get("content"), calls) {
                (Some(Value::String(text)), None) => Ok(ChatMessage::assistant(text.clone())),
                (content, calls) => {
                    let mut parts = match content {
                        Some(Value::String(text)) => vec![ContentPart::text(text.clone())],
                        Some(Value::Array(blocks)) => blocks.iter().filter_map(decode_part).collect(),
                        _ => vec![],
                    };
                    for call in calls.into_iter().flatten() {
                        let call = decode_tool_call(call, names)?;
                        parts.push(ContentPart::tool_use(call.id, call.name, call.input));
                    }
                    Ok(ChatMessage::with_parts(MessageRole::Assistant, parts))
                }
            }
        }
        "tool" => {
            let id = item.get("tool_call_id").and_then(Value::as_str).ok_or("tool message has no tool_call_id")?;
            let content = item.get("content").and_then(Value::as_str).unwrap_or_default();
            Ok(ChatMessage::tool_result(id, content))
        }
        other => Err(format!("unknown role '{}'", other)),
    }
}

fn decode_part(part: &Value) -> Option<ContentPart> {
    match part.get("type").and_then(Value::as_str)? {
        "text" => Some(ContentPart::text(part.get("text")?.as_str()?)),
        "image_url" => Some(ContentPart::image(part.pointer("/image_url/url")?.as_str()?)),
        _ => None,
    }
}

fn decode_tool_call(call: &Value, names: &ToolNameMap) -> Result<ToolCall, String> {
    let id = call.get("id").and_then(Value::as_str).ok_or("tool call has no id")?;
    let name = call
        .pointer("/function/name")
        .and_then(Value::as_str)
        .ok_or("tool call has no function name")?;
    let input = parse_arguments(name, call.pointer("/function/arguments"))?;
    Ok(ToolCall::new(id, names.from_wire(name), input))
}

pub(super) fn decode_response(raw: &Value, names: &ToolNameMap) -> Result<Decoded, String> {
    let choice = raw
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or("response has no choices")?;
    let message = choice.get("message").ok_or("choice has no message")?;

    let content = match message.get("content") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(blocks)) => joined_block_text(blocks),
        _ => String::new(),
    };

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|call| decode_tool_call(call, names))
        .collect::<Result<Vec<_>, _>>()?;

    let stop_reason = choice.get("finish_reason").and_then(Value::as_str).map(|reason| match reason {
        "stop" => StopReason::EndTurn,
        "tool_calls" | "function_call" => StopReason::ToolUse,
        "length" => StopReason::MaxTokens,
        "content_filter" => StopReason::ContentFilter,
        other => StopReason::Other(other.to_string()),
    });

    Ok(Decoded {
        content,
        tool_calls,
        stop_reason,
    })
}

pub(super) fn encode_response(content: &str, tool_calls: &[ToolCall]) -> Value {
    let mut message = json!({ "role": "assistant", "content": content });
    let finish_reason = if tool_calls.is_empty() {
        "stop"
    } else {
        let calls: Vec<Value> = tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": call.input.to_string() },
                })
            })
            .collect();
        message["tool_calls"] = Value::Array(calls);
        "tool_calls"
    };

    json!({
        "object": "chat.completion",
        "choices": [{ "index": 0, "message": message, "finish_reason": finish_reason }],
    })
}
