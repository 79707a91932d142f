use crate::turn::ConfirmationMode;

pub const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_REFUSAL_MESSAGE: &str =
    "You declined the tool call. I will try to answer without using tools.";

pub fn default_tools_enabled() -> bool {
    true
}

pub fn default_local_tools_enabled() -> bool {
    true
}

pub fn default_stream_timeout() -> u64 {
    30
}

pub fn default_session_expiry_minutes() -> i64 {
    30
}

pub fn default_confirmation_mode() -> ConfirmationMode {
    ConfirmationMode::Batch
}

pub fn default_tool_timeout() -> u64 {
    30
}

pub fn default_max_output_bytes() -> u64 {
    1_048_576 // 1MB
}

pub fn default_stdin_json() -> bool {
    true
}

pub fn is_default_stdin_json(value: &bool) -> bool {
    *value == default_stdin_json()
}

pub fn default_connect_timeout() -> u64 {
    10
}
