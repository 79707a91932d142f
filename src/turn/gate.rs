use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, TurnGateError};
use crate::models::{Phase, ToolCallRequest, TurnSessionState};

/// How tool calls are put in front of the human.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationMode {
    /// One decision covers the whole batch.
    #[default]
    Batch,
    /// Each call is decided on its own, in request order.
    #[serde(alias = "per-call")]
    PerCall,
    /// Calls run without asking.
    Auto,
}

impl FromStr for ConfirmationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batch" => Ok(ConfirmationMode::Batch),
            "per-call" | "per_call" | "percall" => Ok(ConfirmationMode::PerCall),
            "auto" => Ok(ConfirmationMode::Auto),
            other => Err(format!(
                "unknown confirmation mode '{}' (expected batch, per-call or auto)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStatus {
    /// Still waiting; these are the calls the human is being asked about.
    Suspended(Vec<ToolCallRequest>),
    Approved(Vec<ToolCallRequest>),
    Denied(Vec<ToolCallRequest>),
}

/// Suspension point between a tool-call request and its execution.
///
/// The gate never blocks. [`request_decision`](Self::request_decision) parks
/// the calls in the session and returns; the answer arrives later through
/// [`resume`](Self::resume), possibly from a different process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationGate {
    mode: ConfirmationMode,
}

impl ConfirmationGate {
    pub fn new(mode: ConfirmationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ConfirmationMode {
        self.mode
    }

    pub fn request_decision(
        &self,
        state: &mut TurnSessionState,
        batch: Vec<ToolCallRequest>,
    ) -> GateStatus {
        if self.mode == ConfirmationMode::Auto {
            return GateStatus::Approved(batch);
        }

        state.set_pending(batch);
        state.set_phase(Phase::AwaitingConfirmation);
        GateStatus::Suspended(self.awaiting(state))
    }

    /// Apply a decision to the calls being asked about. `None` re-enters the
    /// gate without new information and changes nothing.
    pub fn resume(
        &self,
        state: &mut TurnSessionState,
        decision: Option<Decision>,
    ) -> Result<GateStatus> {
        if !state.is_awaiting_confirmation() || state.pending_tool_calls().is_empty() {
            return Err(TurnGateError::NoPendingConfirmation);
        }

        let Some(decision) = decision else {
            return Ok(GateStatus::Suspended(self.awaiting(state)));
        };

        let decided = state.take_pending(self.decision_width(state));
        Ok(match decision {
            Decision::Approved => GateStatus::Approved(decided),
            Decision::Denied => GateStatus::Denied(decided),
        })
    }

    /// The calls a decision would currently apply to.
    pub fn awaiting(&self, state: &TurnSessionState) -> Vec<ToolCallRequest> {
        let pending = state.pending_tool_calls();
        pending[..self.decision_width(state)].to_vec()
    }

    fn decision_width(&self, state: &TurnSessionState) -> usize {
        let pending = state.pending_tool_calls().len();
        match self.mode {
            ConfirmationMode::PerCall => pending.min(1),
            ConfirmationMode::Batch | ConfirmationMode::Auto => pending,
        }
    }
}
