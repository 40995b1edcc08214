//! Provider-legal tool names

use std::collections::HashMap;

use crate::types::{CallableTool, ChatMessage, ContentPart};

/// Longest function name every supported provider accepts
pub const MAX_WIRE_NAME_LEN: usize = 64;

/// Bidirectional mapping between catalog names and provider-legal names
///
/// Providers accept `[A-Za-z0-9_-]{1,64}`. The namespace separator `:` becomes `__`,
/// other characters become `_`, and clashes after truncation get a numeric suffix.
#[derive(Debug, Clone, Default)]
pub struct ToolNameMap {
    to_wire: HashMap<String, String>,
    from_wire: HashMap<String, String>,
}

impl ToolNameMap {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = Self::default();
        for name in names {
            map.insert(name);
        }
        map
    }

    /// Map covering the offered tools and every tool named in the history
    pub fn for_request(messages: &[ChatMessage], tools: &[CallableTool]) -> Self {
        let history = messages.iter().flat_map(|m| m.content.parts()).filter_map(|p| match p {
            ContentPart::ToolUse { name, .. } => Some(name.as_str()),
            _ => None,
        });
        Self::new(tools.iter().map(|t| t.name.as_str()).chain(history))
    }

    fn insert(&mut self, name: &str) {
        if self.to_wire.contains_key(name) {
            return;
        }

        let base = sanitize(name);
        let mut wire = base.clone();
        let mut n = 2;
        while self.from_wire.contains_key(&wire) {
            let suffix = format!("_{}", n);
            wire = format!("{}{}", truncate(&base, MAX_WIRE_NAME_LEN - suffix.len()), suffix);
            n += 1;
        }

        self.to_wire.insert(name.to_string(), wire.clone());
        self.from_wire.insert(wire, name.to_string());
    }

    pub fn to_wire(&self, name: &str) -> String {
        self.to_wire.get(name).cloned().unwrap_or_else(|| sanitize(name))
    }

    /// Unknown wire names pass through unchanged
    pub fn from_wire(&self, wire: &str) -> String {
        self.from_wire.get(wire).cloned().unwrap_or_else(|| wire.to_string())
    }

    pub fn len(&self) -> usize {
        self.to_wire.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_wire.is_empty()
    }
}

/// Rewrite a name into the provider-legal alphabet
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for c in name.chars() {
        match c {
            ':' => out.push_str("__"),
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => out.push(c),
            _ => out.push('_'),
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    truncate(&out, MAX_WIRE_NAME_LEN).to_string()
}

// ASCII only after sanitize, so byte slicing is safe
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        &s[..max]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("calc:add"), "calc__add");
        assert_eq!(sanitize("sequential_thinking"), "sequential_thinking");
        assert_eq!(sanitize("web search:fetch.page"), "web_search__fetch_page");
        assert_eq!(sanitize(""), "_");
        assert_eq!(sanitize(&"x".repeat(100)).len(), MAX_WIRE_NAME_LEN);
    }

    #[test]
    fn test_round_trip() {
        let map = ToolNameMap::new(["calc:add", "files:read", "sequential_thinking"]);
        for name in ["calc:add", "files:read", "sequential_thinking"] {
            assert_eq!(map.from_wire(&map.to_wire(name)), name);
        }
        assert_eq!(map.to_wire("calc:add"), "calc__add");
        assert_eq!(map.from_wire("unknown__tool"), "unknown__tool");
    }

    #[test]
    fn test_truncation_clash_gets_suffix() {
        let long = "s".repeat(70);
        let a = format!("{}:one", long);
        let b = format!("{}:two", long);
        let map = ToolNameMap::new([a.as_str(), b.as_str()]);

        let wire_a = map.to_wire(&a);
        let wire_b = map.to_wire(&b);
        assert_ne!(wire_a, wire_b);
        assert!(wire_b.len() <= MAX_WIRE_NAME_LEN);
        assert!(wire_b.ends_with("_2"));
        assert_eq!(map.from_wire(&wire_b), b);
        assert_eq!(map.len(), 2);
    }
}
