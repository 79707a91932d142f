use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::models::{Message, Reasoning, Role, ToolCallRequest};

#[derive(Serialize)]
pub struct RequestBody {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct WireMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: WireFunctionCall,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct WireFunctionCall {
    pub name: String,
    pub arguments: String,
}

impl From<&ToolCallRequest> for WireToolCall {
    fn from(call: &ToolCallRequest) -> Self {
        Self {
            id: call.id.clone(),
            tool_type: "function".to_string(),
            function: WireFunctionCall {
                name: call.function_name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }
}

/// Convert stored history into request messages.
///
/// The service rejects an assistant `tool_calls` entry that is not answered by
/// tool messages, which is exactly what a denied or cancelled batch leaves
/// behind. Those calls are stripped here; an assistant message left with
/// neither content nor calls is skipped. History itself is untouched.
pub fn to_wire_messages(system_prompt: Option<&str>, history: &[Message]) -> Vec<WireMessage> {
    let answered: HashSet<&str> = history
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();

    let mut wire = Vec::with_capacity(history.len() + 1);
    if let Some(prompt) = system_prompt.filter(|p| !p.is_empty()) {
        wire.push(WireMessage {
            role: Role::System,
            content: Some(prompt.to_string()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        });
    }

    for message in history {
        let tool_calls: Option<Vec<WireToolCall>> = message
            .tool_calls
            .as_ref()
            .map(|calls| {
                calls
                    .iter()
                    .filter(|call| answered.contains(call.id.as_str()))
                    .map(WireToolCall::from)
                    .collect::<Vec<_>>()
            })
            .filter(|calls| !calls.is_empty());

        if message.role == Role::Assistant && message.content.is_none() && tool_calls.is_none() {
            continue;
        }

        wire.push(WireMessage {
            role: message.role,
            content: message.content.clone(),
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
            name: message.name.clone(),
        });
    }

    wire
}

#[derive(Deserialize)]
pub struct StreamFunction {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Deserialize)]
pub struct StreamToolCall {
    #[serde(default)]
    pub index: usize,
    pub id: Option<String>,
    pub function: Option<StreamFunction>,
}

#[derive(Deserialize)]
pub struct StreamDelta {
    pub content: Option<String>,
    pub reasoning: Option<String>,
    pub reasoning_content: Option<String>,
    pub tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Deserialize)]
pub struct Choice {
    pub delta: Option<StreamDelta>,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct StreamError {
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct StreamResponse {
    pub choices: Option<Vec<Choice>>,
    pub error: Option<StreamError>,
}
