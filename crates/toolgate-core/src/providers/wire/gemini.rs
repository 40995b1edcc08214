//! generateContent dialect

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use super::{Decoded, ToolNameMap};
use crate::providers::error::{GatewayError, GatewayResult};
use crate::providers::traits::{SendOptions, StopReason};
use crate::types::{data_url, parse_data_url, ChatMessage, ContentPart, MessageContent, MessageRole, ToolCall, ToolChoice};

/// Schema keywords the API rejects
const UNSUPPORTED_SCHEMA_KEYS: [&str; 2] = ["$schema", "additionalProperties"];

/// Keys whose value is a map of name → subschema
const SCHEMA_MAP_KEYS: [&str; 3] = ["properties", "$defs", "definitions"];

pub(super) fn encode_request(messages: &[ChatMessage], options: &SendOptions, names: &ToolNameMap) -> GatewayResult<Value> {
    let mut system = Vec::new();
    let mut contents = Vec::with_capacity(messages.len());
    // functionResponse must repeat the function name, so remember which call id used which
    let mut call_names: HashMap<&str, String> = HashMap::new();

    for message in messages {
        let role = match message.role {
            MessageRole::System => {
                system.push(json!({ "text": message.content.joined_text() }));
                continue;
            }
            MessageRole::User | MessageRole::Tool => "user",
            MessageRole::Assistant => "model",
        };

        let parts = match &message.content {
            MessageContent::Text(text) => vec![json!({ "text": text })],
            MessageContent::Parts(parts) => {
                let mut wire = Vec::with_capacity(parts.len());
                for part in parts {
                    wire.push(encode_part(part, names, &mut call_names)?);
                }
                wire
            }
        };

        contents.push(json!({ "role": role, "parts": parts }));
    }

    let mut body = json!({ "contents": contents });

    if !system.is_empty() {
        body["systemInstruction"] = json!({ "parts": system });
    }

    if !options.tools.is_empty() {
        let declarations: Vec<Value> = options
            .tools
            .iter()
            .map(|tool| {
                let mut declaration = json!({
                    "name": names.to_wire(&tool.name),
                    "description": tool.description,
                });
                if has_parameters(&tool.input_schema) {
                    declaration["parameters"] = strip_schema(&tool.input_schema);
                }
                declaration
            })
            .collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);

        if let Some(choice) = options.tool_choice {
            let mode = match choice {
                ToolChoice::Auto => "AUTO",
                ToolChoice::None => "NONE",
                ToolChoice::Required => "ANY",
            };
            body["toolConfig"] = json!({ "functionCallingConfig": { "mode": mode } });
        }
    }

    let mut generation = Map::new();
    if let Some(temperature) = options.temperature {
        generation.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = options.max_tokens {
        generation.insert("maxOutputTokens".to_string(), json!(max_tokens));
    }
    if !options.stop.is_empty() {
        generation.insert("stopSequences".to_string(), json!(options.stop));
    }
    if !generation.is_empty() {
        body["generationConfig"] = Value::Object(generation);
    }

    Ok(body)
}

fn encode_part<'a>(
    part: &'a ContentPart,
    names: &ToolNameMap,
    call_names: &mut HashMap<&'a str, String>,
) -> GatewayResult<Value> {
    Ok(match part {
        ContentPart::Text { text } => json!({ "text": text }),
        ContentPart::Image { image_url } => match parse_data_url(image_url) {
            Some((mime, data)) => json!({ "inlineData": { "mimeType": mime, "data": data } }),
            None => json!({ "fileData": { "mimeType": guess_image_mime(image_url), "fileUri": image_url } }),
        },
        ContentPart::ToolUse { id, name, input } => {
            let wire_name = names.to_wire(name);
            call_names.insert(id.as_str(), wire_name.clone());
            json!({ "functionCall": { "id": id, "name": wire_name, "args": input } })
        }
        ContentPart::ToolResult { tool_use_id, content } => {
            let name = call_names.get(tool_use_id.as_str()).ok_or_else(|| {
                GatewayError::invalid_request(format!(
                    "tool result '{}' does not answer any earlier tool call",
                    tool_use_id
                ))
            })?;
            json!({
                "functionResponse": {
                    "id": tool_use_id,
                    "name": name,
                    "response": { "content": content },
                }
            })
        }
    })
}

fn guess_image_mime(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    match path.rsplit('.').next() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

/// An object schema with no properties is sent without `parameters`
fn has_parameters(schema: &Value) -> bool {
    match schema.get("properties") {
        Some(Value::Object(props)) => !props.is_empty(),
        Some(_) => true,
        None => schema.get("type").and_then(Value::as_str) != Some("object"),
    }
}

/// Drop schema keywords the API rejects, at every nesting level
pub(super) fn strip_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                if UNSUPPORTED_SCHEMA_KEYS.contains(&key.as_str()) {
                    continue;
                }
                let value = match value {
                    // property names are data, not keywords
                    Value::Object(entries) if SCHEMA_MAP_KEYS.contains(&key.as_str()) => Value::Object(
                        entries
                            .iter()
                            .map(|(name, sub)| (name.clone(), strip_schema(sub)))
                            .collect(),
                    ),
                    other => strip_schema(other),
                };
                out.insert(key.clone(), value);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(strip_schema).collect()),
        other => other.clone(),
    }
}

pub(super) fn decode_messages(body: &Value, names: &ToolNameMap) -> Result<Vec<ChatMessage>, String> {
    let mut messages: Vec<ChatMessage> = body
        .pointer("/systemInstruction/parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .map(ChatMessage::system)
        .collect();

    let contents = body
        .get("contents")
        .and_then(Value::as_array)
        .ok_or("request has no contents array")?;

    for item in contents {
        let parts = item
            .get("parts")
            .and_then(Value::as_array)
            .ok_or("content entry has no parts")?
            .iter()
            .map(|p| decode_part(p, names))
            .collect::<Result<Vec<_>, _>>()?;

        let role = match item.get("role").and_then(Value::as_str) {
            Some("model") => MessageRole::Assistant,
            Some("user") if !parts.is_empty() && parts.iter().all(|p| matches!(p, ContentPart::ToolResult { .. })) => {
                MessageRole::Tool
            }
            Some("user") => MessageRole::User,
            other => return Err(format!("unknown role {:?}", other)),
        };

        let single_text = match parts.as_slice() {
            [ContentPart::Text { text }] => Some(text.clone()),
            _ => None,
        };
        let message = match single_text {
            Some(text) => ChatMessage {
                role,
                content: MessageContent::Text(text),
            },
            None => ChatMessage::with_parts(role, parts),
        };
        messages.push(message);
    }

    Ok(messages)
}

fn decode_part(part: &Value, names: &ToolNameMap) -> Result<ContentPart, String> {
    let str_at = |pointer: &str| part.pointer(pointer).and_then(Value::as_str).unwrap_or_default();

    if let Some(text) = part.get("text").and_then(Value::as_str) {
        Ok(ContentPart::text(text))
    } else if part.get("inlineData").is_some() {
        Ok(ContentPart::image(data_url(str_at("/inlineData/mimeType"), str_at("/inlineData/data"))))
    } else if part.get("fileData").is_some() {
        Ok(ContentPart::image(str_at("/fileData/fileUri")))
    } else if let Some(call) = part.get("functionCall") {
        let name = str_at("/functionCall/name");
        let id = call.get("id").and_then(Value::as_str).unwrap_or(name);
        let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
        Ok(ContentPart::tool_use(id, names.from_wire(name), args))
    } else if let Some(response) = part.get("functionResponse") {
        let id = response
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_else(|| str_at("/functionResponse/name"));
        let content = match response.pointer("/response/content") {
            Some(Value::String(text)) => text.clone(),
            _ => response.get("response").map(Value::to_string).unwrap_or_default(),
        };
        Ok(ContentPart::tool_result(id, content))
    } else {
        Err(format!("unknown part {}", part))
    }
}

pub(super) fn decode_response(raw: &Value, names: &ToolNameMap) -> Result<Decoded, String> {
    let candidate = match raw.get("candidates").and_then(Value::as_array).and_then(|c| c.first()) {
        Some(candidate) => candidate,
        None => {
            return Err(match raw.pointer("/promptFeedback/blockReason").and_then(Value::as_str) {
                Some(reason) => format!("prompt blocked: {}", reason),
                None => "response has no candidates".to_string(),
            })
        }
    };

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    let parts = candidate.pointer("/content/parts").and_then(Value::as_array);
    for part in parts.into_iter().flatten() {
        if part.get("thought").and_then(Value::as_bool) == Some(true) {
            continue;
        }
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            content.push_str(text);
        } else if let Some(call) = part.get("functionCall") {
            let name = call.get("name").and_then(Value::as_str).ok_or("functionCall has no name")?;
            // ids are optional in this API
            let id = match call.get("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => format!("call_{}", tool_calls.len()),
            };
            let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
            tool_calls.push(ToolCall::new(id, names.from_wire(name), args));
        }
    }

    let finish = candidate.get("finishReason").and_then(Value::as_str);
    let stop_reason = match finish {
        _ if !tool_calls.is_empty() => Some(StopReason::ToolUse),
        None => None,
        Some("STOP") => Some(StopReason::EndTurn),
        Some("MAX_TOKENS") => Some(StopReason::MaxTokens),
        Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => Some(StopReason::ContentFilter),
        Some(other) => Some(StopReason::Other(other.to_string())),
    };

    Ok(Decoded {
        content,
        tool_calls,
        stop_reason,
    })
}

pub(super) fn encode_response(content: &str, tool_calls: &[ToolCall]) -> Value {
    let mut parts = Vec::new();
    if !content.is_empty() {
        parts.push(json!({ "text": content }));
    }
    for call in tool_calls {
        parts.push(json!({ "functionCall": { "id": call.id, "name": call.name, "args": call.input } }));
    }

    json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP",
            "index": 0,
        }]
    })
}
