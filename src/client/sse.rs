//! Server-sent events decoding for streamed completions.
//!
//! The HTTP body arrives as arbitrary byte chunks. [`SseDecoder`] reassembles
//! them into lines, groups `data:` lines into events, and [`decode_fragments`]
//! turns each event into a [`ChatCompletionChunk`] until the `[DONE]` marker.

use super::transport::{FragmentStream, TransportError};
use super::types::ChatCompletionChunk;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;

/// Payload that terminates an OpenAI-style stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Incremental line-oriented SSE parser.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the data payload of every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush whatever is left once the body ends.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data
                .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        // event:, id: and retry: carry nothing the chat stream needs.
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}

/// Parse one event payload into a fragment.
///
/// Some providers report failures in-band as `{"error": {...}}`; those become
/// [`TransportError::Api`].
pub fn parse_fragment(data: &str) -> Result<ChatCompletionChunk, TransportError> {
    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|e| TransportError::Decode(e.to_string()))?;

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(TransportError::Api(message));
    }

    serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
}

struct DecodeState<S> {
    body: std::pin::Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    body_done: bool,
}

/// Turn a byte stream carrying SSE into a stream of fragments.
///
/// The returned stream ends at `[DONE]` or when the body ends, whichever comes
/// first. A body error is yielded once and ends the stream.
pub fn decode_fragments<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<TransportError> + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        body_done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(data) = state.pending.pop_front() {
                if data.trim() == DONE_MARKER {
                    return None;
                }
                return Some((parse_fragment(&data), state));
            }
            if state.body_done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.push(bytes.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.body_done = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.body_done = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}
