//! In-memory logger

use parking_lot::Mutex;

use super::traits::Logger;

/// Severity of a recorded message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A logger that keeps every message, for assertions in tests and diagnostics dumps
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records
    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.records.lock().clone()
    }

    /// Messages at exactly `level`
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Whether any message at `level` contains `needle`
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    fn push(&self, level: LogLevel, message: &str) {
        self.records.lock().push((level, message.to_string()));
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, message: &str) {
        self.push(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::logging::SharedLogger;

    #[test]
    fn test_memory_logger_records() {
        let logger = MemoryLogger::new();
        logger.info("started calc");
        logger.warn("dropping tools");
        crate::log_error!(logger, "server {} failed", "calc");

        assert_eq!(logger.records().len(), 3);
        assert!(logger.contains(LogLevel::Warn, "dropping"));
        assert!(!logger.contains(LogLevel::Info, "dropping"));
        assert_eq!(logger.messages(LogLevel::Error), vec!["server calc failed".to_string()]);

        logger.clear();
        assert!(logger.records().is_empty());
    }

    #[test]
    fn test_shared_logger_object() {
        let memory = Arc::new(MemoryLogger::new());
        let shared: SharedLogger = memory.clone();
        shared.debug("through the trait object");
        assert!(memory.contains(LogLevel::Debug, "trait object"));
    }
}
