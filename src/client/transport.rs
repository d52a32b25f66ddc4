//! Model transport: the seam between the AI step and the network.
//!
//! [`ModelClient`] is the narrow interface the AI step talks to. The production
//! implementation, [`OpenAiClient`], posts to an OpenAI-compatible
//! `/chat/completions` endpoint with `stream: true` and decodes the SSE body.

use super::sse::decode_fragments;
use super::types::{ChatCompletionChunk, ChatMessage, ChatRequest};
use crate::error::{AxonError, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::header::ACCEPT;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Ordered fragments of one response.
pub type FragmentStream = BoxStream<'static, std::result::Result<ChatCompletionChunk, TransportError>>;

/// Failures below the accumulator: HTTP, status, and decoding.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("failed to decode stream fragment: {0}")]
    Decode(String),
}

/// Everything needed to talk to one model on one provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// A model endpoint that can stream a chat completion.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Start a streamed completion for `messages`.
    ///
    /// Returns once the response headers arrive; fragments are pulled from the
    /// returned stream.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
    ) -> std::result::Result<FragmentStream, TransportError>;
}

/// OpenAI-compatible HTTP client.
pub struct OpenAiClient {
    http: reqwest::Client,
    options: ClientOptions,
}

impl OpenAiClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AxonError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { http, options })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.options.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
    ) -> std::result::Result<FragmentStream, TransportError> {
        let request = ChatRequest {
            model: &self.options.model,
            messages,
            stream: true,
        };

        debug!(
            provider = %self.options.provider,
            model = %self.options.model,
            messages = messages.len(),
            "sending chat completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.options.api_key)
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_fragments(response.bytes_stream()))
    }
}
