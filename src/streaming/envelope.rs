//! Envelope decoding and delta extraction.
//!
//! Chat servers wrap each text delta in a JSON envelope, one per line:
//!
//! - OpenAI-compatible SSE: `data: {"choices":[{"delta":{"content":"..."}}]}`
//! - Ollama NDJSON: `{"message":{"content":"..."},"done":false}`
//!
//! Both helpers are total: anything that is not a usable envelope yields
//! `None` and the caller skips the line.

use crate::error::ChatError;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;

/// Prefix of an SSE data line.
pub const SSE_DATA_PREFIX: &[u8] = b"data: ";

/// Stream of extracted text deltas. Only transport failures are errors.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// Decode one transport line into a JSON value.
///
/// A leading `data: ` is stripped. Invalid UTF-8, malformed JSON, blank
/// lines and sentinels such as `[DONE]` all yield `None`.
pub fn decode_line(line: &[u8]) -> Option<Value> {
    let payload = line.strip_prefix(SSE_DATA_PREFIX).unwrap_or(line);
    let text = std::str::from_utf8(payload).ok()?;
    serde_json::from_str(text).ok()
}

/// Extract the text delta carried by a decoded envelope.
///
/// Objects with a `choices` key are read as `choices[0].delta.content`, all
/// others as `message.content`. An empty string counts as no delta.
pub fn extract_delta(envelope: Option<&Value>) -> Option<String> {
    let envelope = envelope?;
    let content = if envelope.get("choices").is_some() {
        envelope
            .get("choices")?
            .get(0)?
            .get("delta")?
            .get("content")?
    } else {
        envelope.get("message")?.get("content")?
    };

    content
        .as_str()
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}

/// Decode and extract in one step.
pub fn line_delta(line: &[u8]) -> Option<String> {
    extract_delta(decode_line(line).as_ref())
}

/// Turn a stream of transport lines into a stream of text deltas.
///
/// Lines without a delta are dropped. The first transport error is yielded
/// and ends the stream.
pub fn delta_stream<S>(lines: S) -> DeltaStream
where
    S: Stream<Item = Result<Bytes, ChatError>> + Send + 'static,
{
    let out = async_stream::stream! {
        let mut lines = Box::pin(lines);
        while let Some(item) = lines.next().await {
            match item {
                Ok(line) => match line_delta(&line) {
                    Some(delta) => {
                        yield Ok(delta);
                    }
                    None => {
                        tracing::trace!(len = line.len(), "skipping line without delta");
                    }
                },
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    };

    Box::pin(out)
}
