use crate::api::delta::{Delta, DeltaStream, ToolCallFragment};
use crate::api::models::StreamResponse;
use crate::error::{Result, TurnGateError};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::time::{timeout, Duration};

/// Deltas carried by one SSE `data:` payload.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChunkDeltas {
    pub deltas: Vec<Delta>,
    /// The payload carried a `finish_reason`.
    pub finished: bool,
}

enum SseLine<'a> {
    Skip,
    Done,
    Data(&'a str),
}

/// Turn a raw SSE body into a [`DeltaStream`].
///
/// Lines are assembled across chunk boundaries before decoding, so multi-byte
/// characters split between chunks survive. The stream ends cleanly on
/// `[DONE]`, or on end-of-body after a `finish_reason`; anything else (network
/// error, idle timeout, error payload, truncated body) yields one
/// `StreamInterrupted` item and stops.
pub fn delta_stream<S>(chunks: S, chunk_timeout: Duration) -> DeltaStream
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut buffer: Vec<u8> = Vec::new();
        let mut done = false;
        let mut ended = false;
        let mut finished = false;

        while !done && !ended {
            match timeout(chunk_timeout, chunks.next()).await {
                Ok(Some(Ok(bytes))) => buffer.extend_from_slice(&bytes),
                Ok(Some(Err(e))) => {
                    yield Err(TurnGateError::StreamInterrupted(e.to_string()));
                    return;
                }
                Ok(None) => {
                    ended = true;
                    if !buffer.is_empty() {
                        buffer.push(b'\n');
                    }
                }
                Err(_) => {
                    yield Err(TurnGateError::StreamInterrupted(format!(
                        "no data received for {} seconds",
                        chunk_timeout.as_secs()
                    )));
                    return;
                }
            }

            for line in drain_lines(&mut buffer) {
                match classify_line(&line) {
                    SseLine::Skip => {}
                    SseLine::Done => {
                        done = true;
                        break;
                    }
                    SseLine::Data(payload) => match parse_chunk(payload) {
                        Ok(chunk) => {
                            finished |= chunk.finished;
                            for delta in chunk.deltas {
                                yield Ok(delta);
                            }
                        }
                        Err(TurnGateError::JsonError(e)) => {
                            tracing::debug!(error = %e, "skipping undecodable stream payload");
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    },
                }
            }
        }

        if !done && !finished {
            yield Err(TurnGateError::StreamInterrupted(
                "stream ended before the response was complete".to_string(),
            ));
        }
    })
}

/// Decode one `data:` payload of a chat-completions stream.
pub fn parse_chunk(payload: &str) -> Result<ChunkDeltas> {
    let parsed: StreamResponse = serde_json::from_str(payload)?;

    if let Some(error) = parsed.error {
        return Err(TurnGateError::StreamInterrupted(
            error
                .message
                .unwrap_or_else(|| "service reported an error".to_string()),
        ));
    }

    let mut chunk = ChunkDeltas::default();
    for choice in parsed.choices.unwrap_or_default() {
        if choice.finish_reason.is_some() {
            chunk.finished = true;
        }

        let Some(delta) = choice.delta else {
            continue;
        };

        if let Some(reasoning) = delta.reasoning.or(delta.reasoning_content) {
            if !reasoning.is_empty() {
                chunk.deltas.push(Delta::ReasoningFragment(reasoning));
            }
        }

        if let Some(content) = delta.content {
            if !content.is_empty() {
                chunk.deltas.push(Delta::TextFragment(content));
            }
        }

        for call in delta.tool_calls.unwrap_or_default() {
            let (name_part, arguments_part) = call
                .function
                .map(|f| (f.name.unwrap_or_default(), f.arguments.unwrap_or_default()))
                .unwrap_or_default();
            chunk.deltas.push(Delta::ToolCallFragment(ToolCallFragment {
                index: call.index,
                id_part: call.id.unwrap_or_default(),
                name_part,
                arguments_part,
            }));
        }
    }

    Ok(chunk)
}

fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
        lines.push(line.trim_end_matches('\r').to_string());
    }
    lines
}

fn classify_line(line: &str) -> SseLine<'_> {
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Skip;
    }

    let Some(colon_pos) = line.find(':') else {
        return SseLine::Skip;
    };
    let field = line[..colon_pos].trim();
    let value = line[colon_pos + 1..].trim_start();

    match field {
        "data" if value == "[DONE]" => SseLine::Done,
        "data" => SseLine::Data(value),
        "event" | "id" | "retry" => {
            tracing::debug!(field, value, "SSE field");
            SseLine::Skip
        }
        _ => {
            tracing::debug!(field, "unknown SSE field");
            SseLine::Skip
        }
    }
}
