#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use turngate::api::{Delta, DeltaStream, ModelClient, ToolCallFragment};
use turngate::error::{Result, TurnGateError};
use turngate::local_tools::{builtins, LocalTool, ToolRegistry};
use turngate::models::{Message, ToolCallRequest};
use turngate::turn::TurnObserver;

/// One recorded call to the model.
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub history: Vec<Message>,
    pub tools_enabled: bool,
}

/// Model client that replays pre-scripted delta streams in order.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Vec<Result<Delta>>>>,
    calls: Mutex<Vec<ModelCall>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Vec<Result<Delta>>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn stream_turn(&self, history: &[Message], tools_enabled: bool) -> Result<DeltaStream> {
        self.calls.lock().unwrap().push(ModelCall {
            history: history.to_vec(),
            tools_enabled,
        });
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TurnGateError::StreamInterrupted("no scripted reply left".to_string()))?;
        Ok(Box::pin(futures::stream::iter(reply)))
    }
}

pub fn text(parts: &[&str]) -> Vec<Result<Delta>> {
    parts
        .iter()
        .map(|p| Ok(Delta::TextFragment(p.to_string())))
        .collect()
}

pub fn tool_call(index: usize, id: &str, name: &str, arguments: &str) -> Result<Delta> {
    Ok(Delta::ToolCallFragment(ToolCallFragment::new(
        index, id, name, arguments,
    )))
}

pub fn interrupted() -> Result<Delta> {
    Err(TurnGateError::StreamInterrupted("connection reset".to_string()))
}

/// Records every invocation of the tools it registers.
#[derive(Clone, Default)]
pub struct Spy {
    invocations: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Spy {
    pub fn invocations(&self) -> Vec<(String, Value)> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.invocations().into_iter().map(|(n, _)| n).collect()
    }

    /// A tool that records its arguments and answers `reply`.
    pub fn tool(&self, name: &str, reply: &str) -> LocalTool {
        let invocations = self.invocations.clone();
        let tool_name = name.to_string();
        let reply = reply.to_string();
        LocalTool::from_fn(
            name,
            "spy tool",
            json!({"type": "object"}),
            move |args: &Map<String, Value>| {
                invocations
                    .lock()
                    .unwrap()
                    .push((tool_name.clone(), Value::Object(args.clone())));
                Ok(reply.clone())
            },
        )
    }
}

/// The weather built-in wrapped so calls are recorded.
pub fn spied_weather(spy: &Spy) -> LocalTool {
    let invocations = spy.invocations.clone();
    LocalTool::from_fn(
        "get_current_weather",
        "Get the current weather in a given location",
        json!({
            "type": "object",
            "properties": {"location": {"type": "string"}},
            "required": ["location"]
        }),
        move |args: &Map<String, Value>| {
            invocations
                .lock()
                .unwrap()
                .push(("get_current_weather".to_string(), Value::Object(args.clone())));
            builtins::handle_get_current_weather(args)
        },
    )
}

pub fn registry_with(tools: Vec<LocalTool>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register(tool);
    }
    registry
}

/// Observer that remembers what it was told.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub text: String,
    pub reasoning: String,
    pub confirmations: Vec<Vec<ToolCallRequest>>,
    pub tool_results: Vec<(String, std::result::Result<String, String>)>,
    pub finished: usize,
}

impl TurnObserver for RecordingObserver {
    fn on_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn on_reasoning(&mut self, text: &str) {
        self.reasoning.push_str(text);
    }

    fn on_confirmation_requested(&mut self, calls: &[ToolCallRequest]) {
        self.confirmations.push(calls.to_vec());
    }

    fn on_tool_result(
        &mut self,
        call: &ToolCallRequest,
        result: &std::result::Result<String, turngate::error::ToolError>,
    ) {
        self.tool_results.push((
            call.function_name.clone(),
            result.clone().map_err(|e| e.to_string()),
        ));
    }

    fn on_reply_finished(&mut self) {
        self.finished += 1;
    }
}
