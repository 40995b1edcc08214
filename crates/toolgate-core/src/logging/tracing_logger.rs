//! Bridge from the [`Logger`] trait to the `tracing` facade
//!
//! Hosts that install a `tracing` subscriber get manager and gateway
//! events alongside their own spans. A leading `[Component]` tag in the
//! message becomes the `component` field.

use super::traits::Logger;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

/// Split `"[ToolServerManager] text"` into `("ToolServerManager", "text")`
fn split_component(message: &str) -> (&str, &str) {
    message
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .map(|(component, text)| (component, text.trim_start()))
        .unwrap_or(("toolgate", message))
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        let (component, text) = split_component(message);
        tracing::debug!(component, "{}", text);
    }

    fn info(&self, message: &str) {
        let (component, text) = split_component(message);
        tracing::info!(component, "{}", text);
    }

    fn warn(&self, message: &str) {
        let (component, text) = split_component(message);
        tracing::warn!(component, "{}", text);
    }

    fn error(&self, message: &str) {
        let (component, text) = split_component(message);
        tracing::error!(component, "{}", text);
    }
}
