use crate::error::ToolError;
use crate::models::ToolCallRequest;

/// Rendering boundary. The engine reports what happens during a turn; it never
/// reads anything back.
pub trait TurnObserver {
    fn on_text(&mut self, _text: &str) {}

    fn on_reasoning(&mut self, _text: &str) {}

    /// Called once each time calls start waiting for a human decision.
    fn on_confirmation_requested(&mut self, _calls: &[ToolCallRequest]) {}

    fn on_tool_result(&mut self, _call: &ToolCallRequest, _result: &Result<String, ToolError>) {}

    /// A streamed reply finished (or broke off) and no more text follows.
    fn on_reply_finished(&mut self) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NullObserver;

impl TurnObserver for NullObserver {}
