mod output;

pub use output::{display_history, display_pending, display_tool_error, display_tool_result, ConsoleObserver};
