//! Error types for the axon CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::client::TransportError;
use crate::exit_codes;
use crate::pattern::TemplateError;
use thiserror::Error;

/// Main error type for axon operations.
///
/// Every step-level variant aborts the pattern run it occurs in; the CLI layer
/// maps the variant to an exit code via [`AxonError::exit_code`].
#[derive(Error, Debug)]
pub enum AxonError {
    /// User provided invalid arguments.
    #[error("{0}")]
    UserError(String),

    /// The configuration file could not be read or is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A step table in a pattern is malformed.
    #[error("invalid step: {0}")]
    InvalidStep(String),

    /// The requested pattern does not exist.
    #[error("pattern {name} not found. Available patterns: {available}")]
    PatternNotFound { name: String, available: String },

    /// A `@name` prompt reference did not resolve.
    #[error("prompt {0} not found")]
    PromptNotFound(String),

    /// A prompt exists but its content could not be materialized.
    #[error("failed to load prompt {name}: {reason}")]
    PromptLoad { name: String, reason: String },

    /// A template failed to parse.
    #[error("failed to render {context} template: {source}")]
    Template {
        context: String,
        #[source]
        source: TemplateError,
    },

    /// The AI step produced no user-facing message.
    #[error(
        "No user message found in the prompt. Try providing a message by typing after the pattern name or piping into the command. For example:\n\n  echo \"Tell me a joke\" | axon -p {prompt}\n\nor\n\n  axon -p {prompt} -- Tell me a joke"
    )]
    NoUserMessage { prompt: String },

    /// A model string was not of the form `provider/model`.
    #[error("invalid model string: {0} (expected provider/model)")]
    InvalidModel(String),

    /// The model's provider is not configured.
    #[error("provider {0} not found")]
    ProviderNotFound(String),

    /// No usable API key could be resolved for a provider.
    #[error("could not resolve API key for provider {provider}: {reason}")]
    Credential { provider: String, reason: String },

    /// A command step failed to spawn or exited unsuccessfully.
    #[error("command failed: {0}")]
    Command(String),

    /// The model response stream failed mid-flight.
    #[error("stream error: {0}")]
    Stream(#[from] TransportError),

    /// The model refused and the refusal policy is `abort`.
    #[error("model refused the request: {0}")]
    Refusal(String),

    /// The run was cancelled before the step completed.
    #[error("cancelled")]
    Cancelled,

    /// Reading or writing the output cache failed.
    #[error("cache error: {0}")]
    Cache(String),
}

impl AxonError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            AxonError::UserError(_)
            | AxonError::Config(_)
            | AxonError::InvalidStep(_)
            | AxonError::PatternNotFound { .. }
            | AxonError::PromptNotFound(_)
            | AxonError::PromptLoad { .. }
            | AxonError::InvalidModel(_)
            | AxonError::Cache(_) => exit_codes::USER_ERROR,
            AxonError::Template { .. }
            | AxonError::NoUserMessage { .. }
            | AxonError::Command(_) => exit_codes::STEP_FAILURE,
            AxonError::ProviderNotFound(_)
            | AxonError::Credential { .. }
            | AxonError::Stream(_)
            | AxonError::Refusal(_) => exit_codes::MODEL_FAILURE,
            AxonError::Cancelled => exit_codes::CANCELLED,
        }
    }
}

/// Result type alias for axon operations.
pub type Result<T> = std::result::Result<T, AxonError>;
