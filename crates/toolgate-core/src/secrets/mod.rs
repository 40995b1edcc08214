//! Credential storage for provider transports
//!
//! `ChainSecretStore::new(vec![memory, env])` is the usual setup: keys set at
//! runtime win over the environment.

mod chain_store;
mod env_store;
mod memory_store;
mod traits;

pub use chain_store::ChainSecretStore;
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use traits::{SecretStore, SecretStoreError, SecretStoreResult};
