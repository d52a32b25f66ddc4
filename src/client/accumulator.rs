//! Streaming response accumulator.
//!
//! Folds the fragments of one streamed response into a single
//! [`ChatCompletion`] and reports, exactly once per channel, the moment each of
//! the content, refusal and tool-call sub-streams finishes.
//!
//! # Channel lifecycle
//!
//! Each channel is a small state machine: `Idle -> Open -> Closed`. A channel
//! opens on its first fragment and closes on the first boundary seen while it
//! is open:
//!
//! - a fragment that carries a finish reason
//! - a fragment that carries data for a different channel
//! - the end of the stream
//!
//! `Closed` is terminal. Data arriving for a closed channel is still merged
//! into the completion, but no second event is raised.

use super::transport::FragmentStream;
use super::types::{ChatCompletion, ChatCompletionChunk, ToolCall};
use crate::error::{AxonError, Result};
use futures::StreamExt;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// A response sub-stream tracked for completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Content,
    Refusal,
    ToolCall,
}

impl Channel {
    const ALL: [Channel; 3] = [Channel::Content, Channel::Refusal, Channel::ToolCall];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ChannelState {
    #[default]
    Idle,
    Open,
    Closed,
}

/// Raised once when a channel's terminal boundary is observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishEvent {
    /// The content text as of the moment the channel closed.
    Content(String),
    /// The refusal text as of the moment the channel closed.
    Refusal(String),
    /// Every tool call assembled so far.
    ToolCalls(Vec<ToolCall>),
}

impl FinishEvent {
    #[cfg(test)]
    pub fn channel(&self) -> Channel {
        match self {
            FinishEvent::Content(_) => Channel::Content,
            FinishEvent::Refusal(_) => Channel::Refusal,
            FinishEvent::ToolCalls(_) => Channel::ToolCall,
        }
    }
}

/// Incremental merge state for one response.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    id: String,
    model: String,
    content: String,
    refusal: String,
    tool_calls: BTreeMap<u32, ToolCall>,
    finish_reason: Option<String>,
    content_state: ChannelState,
    refusal_state: ChannelState,
    tool_state: ChannelState,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one fragment and return the finish events it triggered.
    pub fn add_chunk(&mut self, chunk: &ChatCompletionChunk) -> Vec<FinishEvent> {
        if self.id.is_empty() && !chunk.id.is_empty() {
            self.id = chunk.id.clone();
        }
        if self.model.is_empty() && !chunk.model.is_empty() {
            self.model = chunk.model.clone();
        }

        let Some(choice) = chunk.primary() else {
            return Vec::new();
        };
        let delta = &choice.delta;

        let content = delta.content.as_deref().filter(|s| !s.is_empty());
        let refusal = delta.refusal.as_deref().filter(|s| !s.is_empty());
        let tools = delta.tool_calls.as_deref().filter(|t| !t.is_empty());

        let carried = |channel: Channel| match channel {
            Channel::Content => content.is_some(),
            Channel::Refusal => refusal.is_some(),
            Channel::ToolCall => tools.is_some(),
        };

        let mut events = Vec::new();

        // A fragment for another channel ends any channel left open.
        if Channel::ALL.iter().any(|&c| carried(c)) {
            for channel in Channel::ALL {
                if !carried(channel) {
                    events.extend(self.close(channel));
                }
            }
        }

        if let Some(text) = content {
            self.content.push_str(text);
            self.open(Channel::Content);
        }
        if let Some(text) = refusal {
            self.refusal.push_str(text);
            self.open(Channel::Refusal);
        }
        if let Some(deltas) = tools {
            for delta in deltas {
                let call = self.tool_calls.entry(delta.index).or_insert_with(|| ToolCall {
                    index: delta.index,
                    ..Default::default()
                });
                if let Some(id) = &delta.id {
                    call.id.clone_from(id);
                }
                if let Some(function) = &delta.function {
                    if let Some(name) = &function.name {
                        call.name.push_str(name);
                    }
                    if let Some(arguments) = &function.arguments {
                        call.arguments.push_str(arguments);
                    }
                }
            }
            self.open(Channel::ToolCall);
        }

        if let Some(reason) = &choice.finish_reason {
            self.finish_reason = Some(reason.clone());
            events.extend(self.close_all());
        }

        events
    }

    /// Close every channel still open; called when the stream is exhausted.
    pub fn finish(&mut self) -> Vec<FinishEvent> {
        self.close_all()
    }

    /// The merged completion.
    pub fn into_completion(self) -> ChatCompletion {
        ChatCompletion {
            id: self.id,
            model: self.model,
            content: self.content,
            refusal: (!self.refusal.is_empty()).then_some(self.refusal),
            tool_calls: self.tool_calls.into_values().collect(),
            finish_reason: self.finish_reason,
        }
    }

    fn state_mut(&mut self, channel: Channel) -> &mut ChannelState {
        match channel {
            Channel::Content => &mut self.content_state,
            Channel::Refusal => &mut self.refusal_state,
            Channel::ToolCall => &mut self.tool_state,
        }
    }

    fn open(&mut self, channel: Channel) {
        let state = self.state_mut(channel);
        if *state == ChannelState::Idle {
            *state = ChannelState::Open;
        }
    }

    fn close(&mut self, channel: Channel) -> Option<FinishEvent> {
        let state = self.state_mut(channel);
        if *state != ChannelState::Open {
            return None;
        }
        *state = ChannelState::Closed;

        Some(match channel {
            Channel::Content => FinishEvent::Content(self.content.clone()),
            Channel::Refusal => FinishEvent::Refusal(self.refusal.clone()),
            Channel::ToolCall => FinishEvent::ToolCalls(self.tool_calls.values().cloned().collect()),
        })
    }

    fn close_all(&mut self) -> Vec<FinishEvent> {
        Channel::ALL
            .into_iter()
            .filter_map(|channel| self.close(channel))
            .collect()
    }
}

/// Drive `fragments` to completion.
///
/// * `on_chunk` sees every fragment that carries non-empty content text.
/// * `on_finish` sees each finish event; returning an error aborts the stream.
///
/// A transport error ends the loop immediately with [`AxonError::Stream`];
/// cancellation ends it with [`AxonError::Cancelled`].
pub async fn collect<C, F>(
    mut fragments: FragmentStream,
    cancel: &CancellationToken,
    mut on_chunk: C,
    mut on_finish: F,
) -> Result<ChatCompletion>
where
    C: FnMut(&ChatCompletionChunk),
    F: FnMut(FinishEvent) -> Result<()>,
{
    let mut acc = StreamAccumulator::new();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AxonError::Cancelled),
            next = fragments.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for event in acc.add_chunk(&chunk) {
                    on_finish(event)?;
                }
                if !chunk.content().is_empty() {
                    on_chunk(&chunk);
                }
            }
            Some(Err(e)) => return Err(AxonError::Stream(e)),
            None => break,
        }
    }

    for event in acc.finish() {
        on_finish(event)?;
    }

    Ok(acc.into_completion())
}
