//! The chat turn state machine and its confirmation gate.
//!
//! A turn runs `ready -> awaiting_model`, then either straight back to
//! `ready` with a text reply, or to `awaiting_confirmation` when the model
//! asks for tools. A decision moves it on through `executing_tools` and
//! `awaiting_followup` (approved) or back to `ready` (denied).

mod gate;
mod machine;
mod observer;

pub use gate::{ConfirmationGate, ConfirmationMode, Decision, GateStatus};
pub use machine::{TurnEngine, TurnOutcome, EMPTY_REPLY};
pub use observer::{NullObserver, TurnObserver};
