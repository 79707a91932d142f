pub mod builtins;
mod dynamic;
mod registry;

pub use dynamic::{create_command_tool, execute_command};
pub use registry::{LocalTool, ToolFuture, ToolHandler, ToolRegistry};

use serde_json::{json, Value};

/// Tool schemas in the shape the chat-completions API expects.
pub fn format_tools_for_llm(registry: &ToolRegistry) -> Vec<Value> {
    registry
        .list()
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            })
        })
        .collect()
}
