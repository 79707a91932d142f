use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;
use super::tool::ToolCallRequest;

pub const DEFAULT_GREETING: &str = "How can I help you?";

/// Where a session sits in the turn state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Ready,
    AwaitingModel,
    AwaitingConfirmation,
    ExecutingTools,
    AwaitingFollowup,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Ready => "ready",
            Phase::AwaitingModel => "awaiting_model",
            Phase::AwaitingConfirmation => "awaiting_confirmation",
            Phase::ExecutingTools => "executing_tools",
            Phase::AwaitingFollowup => "awaiting_followup",
        };
        f.write_str(name)
    }
}

/// Everything the turn engine needs to resume a conversation.
///
/// History is append-only: callers read it through [`history`](Self::history)
/// and only the engine appends. [`reset`](Self::reset) is the single way to
/// drop entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnSessionState {
    pub session_id: String,
    pub last_updated: DateTime<Local>,
    history: Vec<Message>,
    #[serde(default)]
    pending_tool_calls: Vec<ToolCallRequest>,
    #[serde(default)]
    phase: Phase,
}

impl TurnSessionState {
    /// A fresh session whose history holds only the greeting, if any.
    pub fn new(greeting: Option<&str>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            last_updated: Local::now(),
            history: greeting_history(greeting),
            pending_tool_calls: Vec::new(),
            phase: Phase::Ready,
        }
    }

    /// Restore a session from an existing history, e.g. an import or a test
    /// fixture. The session starts in `ready`.
    pub fn with_history(history: Vec<Message>) -> Self {
        Self {
            history,
            ..Self::new(None)
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn pending_tool_calls(&self) -> &[ToolCallRequest] {
        &self.pending_tool_calls
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        self.phase == Phase::AwaitingConfirmation
    }

    pub fn reset(&mut self, greeting: Option<&str>) {
        self.history = greeting_history(greeting);
        self.pending_tool_calls.clear();
        self.phase = Phase::Ready;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_updated = Local::now();
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.history.push(message);
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!(session = %self.session_id, from = %self.phase, to = %phase, "phase change");
        }
        self.phase = phase;
    }

    pub(crate) fn set_pending(&mut self, calls: Vec<ToolCallRequest>) {
        self.pending_tool_calls = calls;
    }

    pub(crate) fn take_pending(&mut self, count: usize) -> Vec<ToolCallRequest> {
        let count = count.min(self.pending_tool_calls.len());
        self.pending_tool_calls.drain(..count).collect()
    }

    pub(crate) fn discard_pending(&mut self) -> Vec<ToolCallRequest> {
        std::mem::take(&mut self.pending_tool_calls)
    }
}

fn greeting_history(greeting: Option<&str>) -> Vec<Message> {
    greeting
        .filter(|g| !g.is_empty())
        .map(|g| vec![Message::assistant(g)])
        .unwrap_or_default()
}
