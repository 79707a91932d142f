use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

/// A tool invocation requested by the assistant.
///
/// `arguments` is kept exactly as the model produced it and only parsed when
/// the call is about to run, so a malformed blob never poisons the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub function_name: String,
    pub arguments: String,
}

impl ToolCallRequest {
    pub fn new(
        id: impl Into<String>,
        function_name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            function_name: function_name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the argument blob into a JSON object. A blank blob counts as `{}`.
    pub fn parse_arguments(&self) -> Result<Map<String, Value>, ToolError> {
        if self.arguments.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ToolError::ArgumentParse {
                name: self.function_name.clone(),
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
            Err(e) => Err(ToolError::ArgumentParse {
                name: self.function_name.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_arguments_parse_as_empty_object() {
        let call = ToolCallRequest::new("call_1", "time_now", "  ");
        assert!(call.parse_arguments().unwrap().is_empty());
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let call = ToolCallRequest::new("call_1", "echo", "[1, 2]");
        let err = call.parse_arguments().unwrap_err();
        assert!(err.to_string().contains("expected a JSON object, got an array"));
    }
}
