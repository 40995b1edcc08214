//! Chained secret store with fallback behavior

use std::sync::Arc;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Tries each store in order on read; writes go to the first store that accepts them
pub struct ChainSecretStore {
    stores: Vec<Arc<dyn SecretStore>>,
}

impl ChainSecretStore {
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> Self {
        Self { stores }
    }

    /// Name of the store that currently holds `key`
    pub fn source_of(&self, key: &str) -> Option<&str> {
        self.stores.iter().find(|s| s.has(key)).map(|s| s.name())
    }
}

impl SecretStore for ChainSecretStore {
    fn name(&self) -> &str {
        "chain"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.stores.iter().find_map(|store| store.get(key))
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        for store in &self.stores {
            match store.store(key, value) {
                Err(SecretStoreError::ReadOnly) => continue,
                other => return other,
            }
        }
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        for store in self.stores.iter().filter(|s| s.has(key)) {
            // Read-only members keep their copy
            match store.delete(key) {
                Ok(()) | Err(SecretStoreError::ReadOnly) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChainSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stores.iter().map(|s| s.name()).collect();
        f.debug_struct("ChainSecretStore").field("stores", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{EnvSecretStore, MemorySecretStore};

    #[test]
    fn test_chain_store_priority_and_fallback() {
        let first = Arc::new(MemorySecretStore::with_secrets([("openai", "from_first")]));
        let second = Arc::new(MemorySecretStore::with_secrets([("openai", "from_second"), ("groq", "g")]));

        let chain = ChainSecretStore::new(vec![first, second]);
        assert_eq!(chain.get("openai"), Some("from_first".to_string()));
        assert_eq!(chain.get("groq"), Some("g".to_string()));
        assert_eq!(chain.get("mistral"), None);
        assert_eq!(chain.source_of("groq"), Some("memory"));
    }

    #[test]
    fn test_chain_store_skips_read_only_on_write() {
        let memory = Arc::new(MemorySecretStore::new());
        let chain = ChainSecretStore::new(vec![Arc::new(EnvSecretStore::new()), memory.clone()]);

        chain.store("toolgate_chain_key", "value").unwrap();
        assert_eq!(memory.get("toolgate_chain_key"), Some("value".to_string()));

        chain.delete("toolgate_chain_key").unwrap();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_empty_chain() {
        let chain = ChainSecretStore::new(vec![]);
        assert_eq!(chain.get("openai"), None);
        assert!(matches!(chain.store("k", "v"), Err(SecretStoreError::ReadOnly)));
    }
}
