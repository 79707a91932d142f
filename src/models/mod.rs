mod message;
mod reasoning;
mod session;
mod tool;

pub use message::{Message, Role};
pub use reasoning::{Reasoning, ReasoningEffort};
pub use session::{Phase, TurnSessionState, DEFAULT_GREETING};
pub use tool::ToolCallRequest;
