pub mod client;
pub mod delta;
pub mod models;
pub mod streaming;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Message;

pub use client::OpenAiClient;
pub use delta::{Delta, DeltaStream, ToolCallAccumulator, ToolCallFragment};
pub use models::{to_wire_messages, RequestBody};
pub use streaming::delta_stream;

/// The model service boundary.
///
/// Each call opens one completion over `history` and returns its output as a
/// lazy delta stream. With `tools_enabled == false` no tool schemas are sent,
/// so the service cannot answer with tool calls.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn stream_turn(&self, history: &[Message], tools_enabled: bool) -> Result<DeltaStream>;
}
