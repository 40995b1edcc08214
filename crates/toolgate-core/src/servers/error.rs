//! Tool server errors

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the tool server manager and launchers
///
/// Only `DuplicateId` and `UnknownId` escape lifecycle operations; the rest
/// end up in a handle's `last_error` or in an error tool result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    #[error("Server already exists: {0}")]
    DuplicateId(String),

    #[error("Unknown server: {0}")]
    UnknownId(String),

    #[error("Failed to spawn '{command}': {message}")]
    Spawn { command: String, message: String },

    #[error("Tool discovery timed out after {0:?}")]
    DiscoveryTimeout(Duration),

    #[error("Tool discovery failed: {0}")]
    DiscoveryFailure(String),

    #[error("Discovery cancelled")]
    Cancelled,

    #[error("Server not connected: {0}")]
    NotConnected(String),

    /// The server answered the call with an error
    #[error("Tool call failed: {0}")]
    ToolCall(String),

    /// The connection to the server broke during a call
    #[error("Server connection lost: {0}")]
    Transport(String),
}

impl ServerError {
    pub fn spawn(command: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ServerError::Spawn {
            command: command.into(),
            message: message.to_string(),
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ServerError::spawn("calc-tool", "No such file or directory").to_string(),
            "Failed to spawn 'calc-tool': No such file or directory"
        );
        assert_eq!(
            ServerError::DiscoveryTimeout(Duration::from_millis(250)).to_string(),
            "Tool discovery timed out after 250ms"
        );
        assert_eq!(ServerError::UnknownId("calc".into()).to_string(), "Unknown server: calc");
        assert_eq!(
            ServerError::Transport("Transport closed".into()).to_string(),
            "Server connection lost: Transport closed"
        );
    }
}
