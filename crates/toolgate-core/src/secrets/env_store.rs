//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Provider ids whose variables do not follow `<ID>_API_KEY`
static ENV_VAR_MAP: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    m.insert("gemini", &["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("google", &["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("claude", &["ANTHROPIC_API_KEY"]);
    m.insert("ollama", &[]);
    m
});

/// Read-only store backed by the process environment
///
/// Lookup order for a key: the key itself, the provider mapping
/// (`gemini` → `GEMINI_API_KEY`, `GOOGLE_API_KEY`), then `<KEY>_API_KEY`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }

    /// Variable names tried for `key`, in order
    pub fn candidate_vars(key: &str) -> Vec<String> {
        let mut vars = vec![key.to_string()];
        let lower = key.to_lowercase();
        match ENV_VAR_MAP.get(lower.as_str()) {
            Some(mapped) => vars.extend(mapped.iter().map(|v| v.to_string())),
            None => {
                let auto = format!("{}_API_KEY", key.to_uppercase());
                if auto != key {
                    vars.push(auto);
                }
            }
        }
        vars
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        Self::candidate_vars(key)
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.is_empty())
    }

    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, _key: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }
}
