use futures::Stream;
use std::collections::{BTreeMap, HashSet};
use std::pin::Pin;

use crate::error::Result;
use crate::models::ToolCallRequest;

/// One incremental unit of streamed model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    TextFragment(String),
    ReasoningFragment(String),
    ToolCallFragment(ToolCallFragment),
}

/// A piece of a tool call. Fragments sharing `index` belong to the same call
/// and their parts are concatenated in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub index: usize,
    pub id_part: String,
    pub name_part: String,
    pub arguments_part: String,
}

impl ToolCallFragment {
    pub fn new(
        index: usize,
        id_part: impl Into<String>,
        name_part: impl Into<String>,
        arguments_part: impl Into<String>,
    ) -> Self {
        Self {
            index,
            id_part: id_part.into(),
            name_part: name_part.into(),
            arguments_part: arguments_part.into(),
        }
    }
}

/// Finite, single-use stream of deltas for one model call. An `Err` item means
/// the stream broke off and nothing after it should be trusted.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Delta>> + Send>>;

/// Reassembles streamed tool-call fragments into complete requests.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<usize, ToolCallRequest>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: ToolCallFragment) {
        let call = self
            .calls
            .entry(fragment.index)
            .or_insert_with(|| ToolCallRequest::new("", "", ""));
        call.id.push_str(&fragment.id_part);
        call.function_name.push_str(&fragment.name_part);
        call.arguments.push_str(&fragment.arguments_part);
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Completed requests ordered by stream index. Some services omit the
    /// call id; those calls get `call_<index>` (suffixed if the service
    /// already used that id) so tool results can refer back.
    pub fn finish(self) -> Vec<ToolCallRequest> {
        let mut taken: HashSet<String> = self
            .calls
            .values()
            .filter(|call| !call.id.is_empty())
            .map(|call| call.id.clone())
            .collect();

        self.calls
            .into_iter()
            .map(|(index, mut call)| {
                if call.id.is_empty() {
                    let base = format!("call_{}", index);
                    let mut candidate = base.clone();
                    let mut suffix = 1;
                    while taken.contains(&candidate) {
                        candidate = format!("{}_{}", base, suffix);
                        suffix += 1;
                    }
                    taken.insert(candidate.clone());
                    call.id = candidate;
                }
                call
            })
            .collect()
    }
}
