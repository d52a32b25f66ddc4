//! `provider/model` identifiers.

use crate::error::{AxonError, Result};
use std::fmt;

/// A model addressed through a configured provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    /// Split `provider/model` at the first `/`.
    ///
    /// Everything after the first slash belongs to the model, so
    /// `openrouter/meta-llama/llama-3` names model `meta-llama/llama-3`.
    pub fn parse(value: &str) -> Result<Self> {
        match value.split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => Ok(Self {
                provider: provider.to_string(),
                model: model.to_string(),
            }),
            _ => Err(AxonError::InvalidModel(value.to_string())),
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}
