use thiserror::Error;

#[derive(Debug, Error)]
pub enum TurnGateError {
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Session error: {0}")]
    SessionError(String),
    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),
    #[error("No tool calls are awaiting confirmation")]
    NoPendingConfirmation,
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Failures local to a single tool call. These never abort a turn: the engine
/// renders them into the tool message content instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("failed to parse arguments for tool '{name}': {reason}")]
    ArgumentParse { name: String, reason: String },
    #[error("Tool '{0}' not found")]
    UnknownTool(String),
    #[error("Tool '{name}' failed: {reason}")]
    Execution { name: String, reason: String },
}

impl ToolError {
    /// Text stored as the tool message content when a call fails.
    pub fn to_tool_content(&self) -> String {
        format!("Error: {}", self)
    }
}

pub type Result<T> = std::result::Result<T, TurnGateError>;
