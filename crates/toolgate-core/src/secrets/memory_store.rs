//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreResult};

/// Read-write store for tests and for keys supplied at runtime
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from `(key, value)` pairs
    pub fn with_secrets<I, K, V>(initial: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            secrets: RwLock::new(initial.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.secrets.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        self.secrets.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_crud() {
        let store = MemorySecretStore::new();
        assert!(store.is_empty());

        store.store("anthropic", "sk-ant").unwrap();
        assert_eq!(store.get("anthropic"), Some("sk-ant".to_string()));

        store.store("anthropic", "sk-ant-2").unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("anthropic"), Some("sk-ant-2".to_string()));

        store.delete("anthropic").unwrap();
        assert!(!store.has("anthropic"));
    }

    #[test]
    fn test_memory_store_with_initial() {
        let store = MemorySecretStore::with_secrets([("openai", "sk-1"), ("groq", "gsk-2")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("groq"), Some("gsk-2".to_string()));
    }

    #[test]
    fn test_memory_store_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemorySecretStore::new());
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let key = format!("key_{}", i);
                    store.store(&key, "value").unwrap();
                    assert!(store.has(&key));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 10);
    }
}
