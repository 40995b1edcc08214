//! Tool catalog and built-in tools
//!
//! ```text
//!   connected servers ──┐
//!                       ├─> build_catalog ─> [CallableTool] ─> ProviderGateway
//!   built-in tools ─────┘
//! ```

mod builtin;
mod catalog;

pub use builtin::{default_builtins, BuiltinError, BuiltinTool, SequentialThinking, ThoughtStep};
pub use catalog::{build_catalog, resolve, CatalogOptions, CollisionPolicy, NamingStyle, ServerTools};
