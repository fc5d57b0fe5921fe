//! Error types for convoy.

use thiserror::Error;

/// Primary error type for all convoy operations.
#[derive(Error, Debug)]
pub enum ConvoyError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Decision provider error: {0}")]
    Decision(String),

    #[error("Tool execution error: {tool_name} — {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Session error: {0}")]
    Session(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ConvoyError {
    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Whether the error is fatal to the current turn.
    ///
    /// Tool failures are fed back into the model context as result content
    /// and never abort a turn; decision and session failures do.
    pub fn is_turn_fatal(&self) -> bool {
        !matches!(self, Self::ToolExecution { .. })
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ConvoyError>;
