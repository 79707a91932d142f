use futures::StreamExt;

use crate::api::{Delta, DeltaStream, ModelClient, ToolCallAccumulator, ToolCallFragment};
use crate::config::defaults::DEFAULT_REFUSAL_MESSAGE;
use crate::error::{Result, ToolError, TurnGateError};
use crate::local_tools::ToolRegistry;
use crate::models::{Message, Phase, ToolCallRequest, TurnSessionState};

use super::gate::{ConfirmationGate, ConfirmationMode, Decision, GateStatus};
use super::observer::TurnObserver;

/// Stored when the model produced no text at all.
pub const EMPTY_REPLY: &str = "I did not receive any reply.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// An assistant reply was appended and the session is ready again.
    Replied,
    /// The turn is parked at the confirmation gate.
    AwaitingConfirmation(Vec<ToolCallRequest>),
    /// The batch was refused; a refusal message was appended.
    Denied,
}

enum FirstDelta {
    Text(String),
    ToolCall(ToolCallFragment),
    Empty,
}

/// Drives one session through a turn.
///
/// Every entry point takes the session state by `&mut` and leaves it in a
/// state that can be persisted and resumed later. At most one round of tool
/// execution happens per user input: the follow-up call after tools ran is
/// always made with tools disabled.
pub struct TurnEngine<'a> {
    client: &'a dyn ModelClient,
    registry: &'a ToolRegistry,
    gate: ConfirmationGate,
    refusal_message: String,
}

impl<'a> TurnEngine<'a> {
    pub fn new(
        client: &'a dyn ModelClient,
        registry: &'a ToolRegistry,
        gate: ConfirmationGate,
    ) -> Self {
        Self {
            client,
            registry,
            gate,
            refusal_message: DEFAULT_REFUSAL_MESSAGE.to_string(),
        }
    }

    pub fn with_refusal_message(mut self, message: impl Into<String>) -> Self {
        self.refusal_message = message.into();
        self
    }

    /// Start a turn with new user input. Calls still waiting for a decision
    /// are dropped unexecuted.
    pub async fn submit_user_input(
        &self,
        state: &mut TurnSessionState,
        input: &str,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome> {
        match state.phase() {
            Phase::Ready => {}
            Phase::AwaitingConfirmation => {
                let dropped = state.discard_pending();
                tracing::info!(
                    session = %state.session_id,
                    discarded = dropped.len(),
                    "new input cancels pending tool calls"
                );
            }
            stale => {
                tracing::warn!(
                    session = %state.session_id,
                    phase = %stale,
                    "session was left mid-transition; starting over from ready"
                );
                state.discard_pending();
            }
        }

        state.set_phase(Phase::Ready);
        state.append(Message::user(input));
        state.touch();
        self.request_model(state, observer).await
    }

    /// Deliver a decision to the confirmation gate. `None` re-enters without
    /// a decision: the outstanding calls are returned and nothing runs.
    pub async fn resolve_confirmation(
        &self,
        state: &mut TurnSessionState,
        decision: Option<Decision>,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome> {
        let status = self.gate.resume(state, decision)?;
        state.touch();
        self.settle(state, status, false, observer).await
    }

    async fn request_model(
        &self,
        state: &mut TurnSessionState,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome> {
        state.set_phase(Phase::AwaitingModel);
        let mut stream = match self.client.stream_turn(state.history(), true).await {
            Ok(stream) => stream,
            Err(e) => return abort(state, e),
        };

        let first = match classify(&mut stream, observer).await {
            Ok(first) => first,
            Err(e) => {
                observer.on_reply_finished();
                return abort(state, e);
            }
        };

        match first {
            FirstDelta::Text(text) => self.stream_reply(state, Some(text), stream, observer).await,
            FirstDelta::Empty => self.stream_reply(state, None, stream, observer).await,
            FirstDelta::ToolCall(fragment) => {
                let calls = match drain_tool_calls(fragment, &mut stream, observer).await {
                    Ok(calls) => calls,
                    Err(e) => return abort(state, e),
                };
                tracing::info!(
                    session = %state.session_id,
                    calls = calls.len(),
                    "model requested tools"
                );

                state.append(Message::assistant_tool_calls(calls.clone()));
                let status = self.gate.request_decision(state, calls);
                self.settle(state, status, true, observer).await
            }
        }
    }

    async fn settle(
        &self,
        state: &mut TurnSessionState,
        status: GateStatus,
        fresh_request: bool,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome> {
        match status {
            GateStatus::Suspended(calls) => {
                if fresh_request {
                    observer.on_confirmation_requested(&calls);
                }
                Ok(TurnOutcome::AwaitingConfirmation(calls))
            }
            GateStatus::Approved(calls) => {
                self.execute_tools(state, &calls, observer).await;
                self.after_decision(state, observer).await
            }
            GateStatus::Denied(calls) if self.gate.mode() == ConfirmationMode::PerCall => {
                for call in &calls {
                    tracing::info!(tool = %call.function_name, id = %call.id, "tool call denied");
                    let content = format!("User denied tool call for {}.", call.function_name);
                    state.append(Message::tool(call, content));
                }
                self.after_decision(state, observer).await
            }
            GateStatus::Denied(calls) => {
                tracing::info!(
                    session = %state.session_id,
                    denied = calls.len(),
                    "tool calls denied"
                );
                state.append(Message::assistant(self.refusal_message.clone()));
                state.set_phase(Phase::Ready);
                observer.on_text(&self.refusal_message);
                observer.on_reply_finished();
                Ok(TurnOutcome::Denied)
            }
        }
    }

    /// Either ask about the next pending call or, once none are left, let the
    /// model narrate the results.
    async fn after_decision(
        &self,
        state: &mut TurnSessionState,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome> {
        if !state.pending_tool_calls().is_empty() {
            state.set_phase(Phase::AwaitingConfirmation);
            let next = self.gate.awaiting(state);
            observer.on_confirmation_requested(&next);
            return Ok(TurnOutcome::AwaitingConfirmation(next));
        }

        self.follow_up(state, observer).await
    }

    async fn execute_tools(
        &self,
        state: &mut TurnSessionState,
        calls: &[ToolCallRequest],
        observer: &mut dyn TurnObserver,
    ) {
        state.set_phase(Phase::ExecutingTools);
        for call in calls {
            let result = self.run_tool(call).await;
            let content = match &result {
                Ok(text) => text.clone(),
                Err(e) => e.to_tool_content(),
            };
            observer.on_tool_result(call, &result);
            state.append(Message::tool(call, content));
        }
    }

    async fn run_tool(&self, call: &ToolCallRequest) -> std::result::Result<String, ToolError> {
        let arguments = call.parse_arguments().inspect_err(|e| {
            tracing::warn!(tool = %call.function_name, id = %call.id, error = %e, "bad tool arguments");
        })?;

        tracing::info!(tool = %call.function_name, id = %call.id, "executing tool");
        self.registry
            .invoke(&call.function_name, &arguments)
            .await
            .inspect_err(|e| {
                tracing::warn!(tool = %call.function_name, id = %call.id, error = %e, "tool failed");
            })
    }

    async fn follow_up(
        &self,
        state: &mut TurnSessionState,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome> {
        state.set_phase(Phase::AwaitingFollowup);
        let stream = match self.client.stream_turn(state.history(), false).await {
            Ok(stream) => stream,
            Err(e) => return abort(state, e),
        };
        self.stream_reply(state, None, stream, observer).await
    }

    /// Forward text to the observer and append the finished reply. If the
    /// stream breaks off, the text already shown stays shown but nothing is
    /// appended.
    async fn stream_reply(
        &self,
        state: &mut TurnSessionState,
        first: Option<String>,
        mut stream: DeltaStream,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnOutcome> {
        let mut reply = String::new();
        if let Some(text) = first {
            observer.on_text(&text);
            reply.push_str(&text);
        }

        while let Some(item) = stream.next().await {
            match item {
                Ok(Delta::TextFragment(text)) => {
                    observer.on_text(&text);
                    reply.push_str(&text);
                }
                Ok(Delta::ReasoningFragment(text)) => observer.on_reasoning(&text),
                Ok(Delta::ToolCallFragment(fragment)) => {
                    tracing::warn!(index = fragment.index, "dropping tool-call fragment in a text reply");
                }
                Err(e) => {
                    observer.on_reply_finished();
                    return abort(state, e);
                }
            }
        }

        if reply.is_empty() {
            observer.on_text(EMPTY_REPLY);
            reply.push_str(EMPTY_REPLY);
        }
        observer.on_reply_finished();

        state.append(Message::assistant(reply));
        state.set_phase(Phase::Ready);
        Ok(TurnOutcome::Replied)
    }
}

/// Read until the first delta that decides what kind of reply this is.
/// Reasoning shown before that point does not count.
async fn classify(
    stream: &mut DeltaStream,
    observer: &mut dyn TurnObserver,
) -> Result<FirstDelta> {
    while let Some(item) = stream.next().await {
        match item? {
            Delta::ReasoningFragment(text) => observer.on_reasoning(&text),
            Delta::TextFragment(text) => return Ok(FirstDelta::Text(text)),
            Delta::ToolCallFragment(fragment) => return Ok(FirstDelta::ToolCall(fragment)),
        }
    }
    Ok(FirstDelta::Empty)
}

/// A tool-call reply is only actionable once the whole stream is drained.
async fn drain_tool_calls(
    first: ToolCallFragment,
    stream: &mut DeltaStream,
    observer: &mut dyn TurnObserver,
) -> Result<Vec<ToolCallRequest>> {
    let mut accumulator = ToolCallAccumulator::new();
    accumulator.push(first);

    while let Some(item) = stream.next().await {
        match item? {
            Delta::ToolCallFragment(fragment) => accumulator.push(fragment),
            Delta::ReasoningFragment(text) => observer.on_reasoning(&text),
            Delta::TextFragment(text) => {
                tracing::debug!(len = text.len(), "dropping text in a tool-call reply");
            }
        }
    }

    Ok(accumulator.finish())
}

fn abort<T>(state: &mut TurnSessionState, error: TurnGateError) -> Result<T> {
    tracing::warn!(session = %state.session_id, phase = %state.phase(), error = %error, "turn aborted");
    state.set_phase(Phase::Ready);
    Err(error)
}
