//! Console logger implementation

use super::traits::Logger;

/// A logger that writes to stderr, with info on stdout
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    prefix: String,
    verbose: bool,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    /// Create a console logger with the default prefix
    pub fn new() -> Self {
        Self {
            prefix: "[Toolgate]".to_string(),
            verbose: false,
        }
    }

    /// Create a console logger with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            verbose: false,
        }
    }

    /// Also print debug messages
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    fn line(&self, level: &str, message: &str) -> String {
        format!("{} {}: {}", self.prefix, level, message)
    }
}

impl Logger for ConsoleLogger {
    fn debug(&self, message: &str) {
        if self.verbose {
            eprintln!("{}", self.line("DEBUG", message));
        }
    }

    fn info(&self, message: &str) {
        println!("{}", self.line("INFO", message));
    }

    fn warn(&self, message: &str) {
        eprintln!("{}", self.line("WARN", message));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", self.line("ERROR", message));
    }
}
