//! Config loading, merging, and lookup operations.

use super::model::{Config, ConfigFile};
use super::paths::CONFIG_FILE;
use super::prompt::{Prompt, scan_prompt_dir};
use super::types::{DEFAULT_MODEL, ProviderConfig, RefusalPolicy};
use crate::client::{ClientOptions, ModelRef};
use crate::error::{AxonError, Result};
use crate::pattern::Pattern;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

impl Config {
    /// Load the effective configuration.
    ///
    /// Starts from [`Config::builtin`] and merges the file at `path`, or at
    /// `<config_home>/config.toml` when no path is given. A missing default
    /// file is not an error; a missing explicit file is.
    ///
    /// # Arguments
    ///
    /// * `path` - Explicit config file from `--config`
    /// * `config_home` - Directory relative prompt paths resolve against
    pub fn load(path: Option<&Path>, config_home: impl Into<PathBuf>) -> Result<Self> {
        let config_home = config_home.into();
        let mut config = Self::builtin(&config_home);

        let (file_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_home.join(CONFIG_FILE), false),
        };

        if !required && !file_path.exists() {
            debug!(path = %file_path.display(), "no config file, using built-in defaults");
            return Ok(config);
        }

        let content = std::fs::read_to_string(&file_path).map_err(|e| {
            AxonError::Config(format!(
                "failed to read config file '{}': {}",
                file_path.display(),
                e
            ))
        })?;

        info!(path = %file_path.display(), "loaded config file");
        config.merge(Self::from_toml(&content, &config_home)?);
        Ok(config)
    }

    /// Parse a config file body.
    pub fn from_toml(toml_str: &str, config_home: impl Into<PathBuf>) -> Result<Self> {
        let file: ConfigFile = toml::from_str(toml_str)
            .map_err(|e| AxonError::Config(format!("failed to parse config TOML: {}", e)))?;
        Ok(Self::from_file(file, config_home))
    }

    /// Overlay `other` onto `self`.
    ///
    /// Set fields in `other` win. Providers merge field-wise by name, prompts
    /// by key, and patterns replace a same-named pattern or are appended.
    pub fn merge(&mut self, other: Config) {
        if other.override_model.is_some() {
            self.override_model = other.override_model;
        }
        if other.quiet.is_some() {
            self.quiet = other.quiet;
        }

        self.general.merge(other.general);

        for provider in other.providers {
            match self.providers.iter_mut().find(|p| p.name == provider.name) {
                Some(existing) => existing.merge(provider),
                None => self.providers.push(provider),
            }
        }

        self.prompts.extend(other.prompts);

        for pattern in other.patterns {
            match self.patterns.iter_mut().find(|p| p.name == pattern.name) {
                Some(existing) => *existing = pattern,
                None => self.patterns.push(pattern),
            }
        }
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, model: Option<&str>, quiet: bool) -> Self {
        if let Some(model) = model {
            self.override_model = Some(model.to_string());
        }
        if quiet {
            self.quiet = Some(true);
        }
        self
    }

    pub fn quiet(&self) -> bool {
        self.quiet.unwrap_or(false)
    }

    pub fn refusal_policy(&self) -> RefusalPolicy {
        self.general.on_refusal.unwrap_or_default()
    }

    /// Look up a pattern by name.
    ///
    /// A name starting with `@` yields a one-step pattern for that prompt.
    pub fn pattern(&self, name: &str) -> Result<Pattern> {
        if name.starts_with('@') {
            return Ok(Pattern::single_prompt(name));
        }

        self.patterns
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| AxonError::PatternNotFound {
                name: name.to_string(),
                available: self.pattern_names().join(", "),
            })
    }

    /// Pattern names in definition order.
    pub fn pattern_names(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.name.clone()).collect()
    }

    /// Every known prompt name, including those on the prompt path, sorted.
    pub fn prompt_names(&mut self) -> Vec<String> {
        self.scan_prompt_path();
        let mut names: Vec<String> = self.prompts.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up a prompt by name (without the `@`) and load its text.
    ///
    /// Names not in the config trigger a scan of the prompt path.
    pub fn prompt(&mut self, name: &str) -> Result<&Prompt> {
        if !self.prompts.contains_key(name) {
            self.scan_prompt_path();
        }

        let prompt = self
            .prompts
            .get_mut(name)
            .ok_or_else(|| AxonError::PromptNotFound(name.to_string()))?;
        prompt.load()?;
        Ok(&*prompt)
    }

    /// Look up a prompt without loading it. The prompt path is scanned only
    /// when `name` is not already known.
    pub fn find_prompt(&mut self, name: &str) -> Option<&Prompt> {
        if !self.prompts.contains_key(name) {
            self.scan_prompt_path();
        }
        self.prompts.get(name)
    }

    /// Directories on the prompt path, resolved against the config home.
    pub fn prompt_dirs(&self) -> Vec<PathBuf> {
        self.general
            .prompt_path
            .iter()
            .flatten()
            .map(|entry| {
                let path = PathBuf::from(entry);
                if path.is_relative() {
                    self.config_home.join(path)
                } else {
                    path
                }
            })
            .collect()
    }

    fn scan_prompt_path(&mut self) {
        for dir in self.prompt_dirs() {
            scan_prompt_dir(&dir, &mut self.prompts);
        }
    }

    pub fn provider(&self, name: &str) -> Result<&ProviderConfig> {
        self.providers
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| AxonError::ProviderNotFound(name.to_string()))
    }

    /// Model string for a step: command-line override, then the step's own
    /// model, then `general.model`.
    pub fn select_model(&self, step_model: Option<&str>) -> String {
        self.override_model
            .as_deref()
            .or(step_model)
            .or(self.general.model.as_deref())
            .unwrap_or(DEFAULT_MODEL)
            .to_string()
    }

    /// Everything needed to connect to `model`, including the resolved key.
    pub async fn client_options(
        &self,
        model: &ModelRef,
        cancel: &CancellationToken,
    ) -> Result<ClientOptions> {
        let provider = self.provider(&model.provider)?;
        let base_url = provider.base_url.clone().ok_or_else(|| {
            AxonError::Config(format!("provider {} has no base_url", provider.name))
        })?;
        let api_key = provider.resolve_api_key(cancel).await?;
        Ok(ClientOptions {
            provider: provider.name.clone(),
            model: model.model.clone(),
            base_url,
            api_key,
        })
    }
}
