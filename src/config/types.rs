//! Supporting types for axon configuration.

use super::paths::user_shell;
use crate::error::{AxonError, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Model used when neither the command line, the step, nor the config names one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

/// What an AI step does when the model refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefusalPolicy {
    /// Log the refusal at warn level and return whatever content arrived.
    #[default]
    Report,
    /// Fail the step with a refusal error.
    Abort,
}

/// The `[general]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default `provider/model`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Directories scanned for prompts. Relative entries resolve against the
    /// config home.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_path: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_refusal: Option<RefusalPolicy>,
}

impl GeneralConfig {
    /// Overlay `other` on `self`. Set fields replace, `prompt_path` appends.
    pub fn merge(&mut self, other: GeneralConfig) {
        if other.model.is_some() {
            self.model = other.model;
        }
        if let Some(paths) = other.prompt_path {
            self.prompt_path.get_or_insert_with(Vec::new).extend(paths);
        }
        if other.on_refusal.is_some() {
            self.on_refusal = other.on_refusal;
        }
    }
}

/// One `[[providers]]` entry: an OpenAI-compatible endpoint and its key.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Literal key. Takes precedence over the other sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Shell command whose trimmed stdout is the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_cmd: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("api_key_cmd", &self.api_key_cmd)
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(name: &str, base_url: &str, api_key_env: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: Some(base_url.to_string()),
            api_key_env: Some(api_key_env.to_string()),
            ..Default::default()
        }
    }

    /// Field-wise overlay of a same-named provider.
    pub fn merge(&mut self, other: ProviderConfig) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.api_key_env.is_some() {
            self.api_key_env = other.api_key_env;
        }
        if other.api_key_cmd.is_some() {
            self.api_key_cmd = other.api_key_cmd;
        }
    }

    /// Resolve the API key: literal, then environment variable, then command.
    ///
    /// The first source that yields a non-blank value wins. A running
    /// `api_key_cmd` is killed when `cancel` fires.
    pub async fn resolve_api_key(&self, cancel: &CancellationToken) -> Result<String> {
        if let Some(key) = non_blank(self.api_key.as_deref()) {
            return Ok(key.to_string());
        }

        if let Some(var) = non_blank(self.api_key_env.as_deref())
            && let Ok(value) = std::env::var(var)
            && let Some(key) = non_blank(Some(value.as_str()))
        {
            debug!(provider = %self.name, var, "using API key from environment");
            return Ok(key.to_string());
        }

        if let Some(cmd) = non_blank(self.api_key_cmd.as_deref()) {
            return self.run_key_command(cmd, cancel).await;
        }

        let reason = match non_blank(self.api_key_env.as_deref()) {
            Some(var) => format!("set {} or add api_key / api_key_cmd to the provider", var),
            None => "no api_key, api_key_env, or api_key_cmd configured".to_string(),
        };
        Err(AxonError::Credential {
            provider: self.name.clone(),
            reason,
        })
    }

    async fn run_key_command(&self, cmd: &str, cancel: &CancellationToken) -> Result<String> {
        let shell = user_shell();
        debug!(provider = %self.name, shell = %shell, "running api_key_cmd");

        let mut command = Command::new(&shell);
        command
            .arg("-c")
            .arg(cmd)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let output = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(provider = %self.name, "cancelled, killing api_key_cmd");
                return Err(AxonError::Cancelled);
            }
            output = command.output() => output.map_err(|e| AxonError::Credential {
                provider: self.name.clone(),
                reason: format!("failed to run api_key_cmd: {}", e),
            })?,
        };

        if !output.status.success() {
            return Err(AxonError::Credential {
                provider: self.name.clone(),
                reason: format!("api_key_cmd exited with {}", output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match non_blank(Some(&*stdout)) {
            Some(key) => Ok(key.to_string()),
            None => Err(AxonError::Credential {
                provider: self.name.clone(),
                reason: "api_key_cmd printed nothing".to_string(),
            }),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
