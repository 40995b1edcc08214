//! Configuration provider abstractions
//!
//! - `MemoryConfigProvider`: In-memory
//! - `FileConfigProvider`: YAML file-based (user/workspace level)

mod file;
mod memory;
mod settings;
mod traits;

pub use file::{ConfigFile, ConfigLevel, FileConfigProvider};
pub use memory::MemoryConfigProvider;
pub use settings::OrchestratorSettings;
pub use traits::{ConfigError, ConfigProvider, ConfigResult};
