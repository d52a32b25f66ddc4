//! In-memory model client and fragment builders for tests.

use super::transport::{FragmentStream, ModelClient, TransportError};
use super::types::{
    ChatCompletionChunk, ChatMessage, ChunkChoice, ChunkDelta, FunctionDelta, ToolCallDelta,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex};

enum Script {
    Fragments(Vec<Result<ChatCompletionChunk, String>>),
    Hang,
}

/// A [`ModelClient`] that replays a fixed list of fragments and records the
/// messages it was sent.
pub struct ScriptedClient {
    script: Script,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedClient {
    pub fn with_fragments(fragments: Vec<Result<ChatCompletionChunk, String>>) -> Self {
        Self {
            script: Script::Fragments(fragments),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Streams `text` word by word, then a `stop` finish marker.
    pub fn replying(text: &str) -> Self {
        let mut fragments: Vec<_> = text
            .split_inclusive(' ')
            .map(|word| Ok(content_chunk(word)))
            .collect();
        fragments.push(Ok(finish_chunk("stop")));
        Self::with_fragments(fragments)
    }

    /// Never yields a fragment.
    pub fn hanging() -> Self {
        Self {
            script: Script::Hang,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle on the recorded requests, usable after the client is moved.
    pub fn requests(&self) -> Arc<Mutex<Vec<Vec<ChatMessage>>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
    ) -> Result<FragmentStream, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(messages.to_vec());

        match &self.script {
            Script::Fragments(fragments) => {
                let items: Vec<_> = fragments
                    .iter()
                    .cloned()
                    .map(|f| f.map_err(TransportError::Api))
                    .collect();
                Ok(stream::iter(items).boxed())
            }
            Script::Hang => Ok(stream::pending().boxed()),
        }
    }
}

fn chunk(delta: ChunkDelta, finish_reason: Option<&str>) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: "chatcmpl-test".to_string(),
        model: "test-model".to_string(),
        choices: vec![ChunkChoice {
            index: 0,
            delta,
            finish_reason: finish_reason.map(str::to_string),
        }],
    }
}

pub fn content_chunk(text: &str) -> ChatCompletionChunk {
    chunk(
        ChunkDelta {
            content: Some(text.to_string()),
            ..Default::default()
        },
        None,
    )
}

pub fn refusal_chunk(text: &str) -> ChatCompletionChunk {
    chunk(
        ChunkDelta {
            refusal: Some(text.to_string()),
            ..Default::default()
        },
        None,
    )
}

pub fn tool_chunk(index: u32, id: Option<&str>, name: Option<&str>, args: &str) -> ChatCompletionChunk {
    chunk(
        ChunkDelta {
            tool_calls: Some(vec![ToolCallDelta {
                index,
                id: id.map(str::to_string),
                function: Some(FunctionDelta {
                    name: name.map(str::to_string),
                    arguments: Some(args.to_string()),
                }),
            }]),
            ..Default::default()
        },
        None,
    )
}

pub fn finish_chunk(reason: &str) -> ChatCompletionChunk {
    chunk(ChunkDelta::default(), Some(reason))
}
