//! Config struct definition and built-in defaults.

use super::prompt::{Prompt, PromptTable};
use super::types::{GeneralConfig, ProviderConfig};
use crate::pattern::{Pattern, Step};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

const DEFAULT_SYSTEM_PROMPT: &str = "\
# IDENTITY and PURPOSE

You are an expert at interpreting questions and answering them clearly and \
concisely. You take in a question or request and respond with the most useful \
answer you can give.

# STEPS

- Read the input carefully and work out what is actually being asked.

- Answer directly. Add detail only where it helps.

# OUTPUT INSTRUCTIONS

- Output plain text or Markdown only.

- Do not repeat the question back.
";

/// On-disk shape of `config.toml`.
///
/// Unknown keys are ignored so newer files still load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub general: GeneralConfig,
    pub providers: Vec<ProviderConfig>,
    pub prompts: BTreeMap<String, PromptTable>,
    pub patterns: Vec<Pattern>,
}

/// Runtime configuration: built-in defaults merged with the config file and
/// the command-line overrides.
#[derive(Debug, Clone)]
pub struct Config {
    /// `-m` from the command line. Beats every other model source.
    pub override_model: Option<String>,
    /// `-q` from the command line.
    pub quiet: Option<bool>,
    pub general: GeneralConfig,
    pub providers: Vec<ProviderConfig>,
    pub prompts: HashMap<String, Prompt>,
    pub patterns: Vec<Pattern>,
    pub(super) config_home: PathBuf,
}

impl Config {
    /// A config with no providers, prompts, or patterns.
    pub fn empty(config_home: impl Into<PathBuf>) -> Self {
        Self {
            override_model: None,
            quiet: None,
            general: GeneralConfig::default(),
            providers: Vec::new(),
            prompts: HashMap::new(),
            patterns: Vec::new(),
            config_home: config_home.into(),
        }
    }

    /// The built-in configuration every config file is merged onto.
    pub fn builtin(config_home: impl Into<PathBuf>) -> Self {
        let config_home = config_home.into();
        let prompt_dir = config_home.join("prompts");

        let mut prompts = HashMap::new();
        prompts.insert(
            "default".to_string(),
            Prompt::inline("default", Some(DEFAULT_SYSTEM_PROMPT), None),
        );

        Self {
            override_model: None,
            quiet: None,
            general: GeneralConfig {
                model: Some(super::types::DEFAULT_MODEL.to_string()),
                prompt_path: Some(vec![prompt_dir.to_string_lossy().into_owned()]),
                on_refusal: None,
            },
            providers: vec![
                ProviderConfig::new("openai", "https://api.openai.com/v1", "OPENAI_API_KEY"),
                ProviderConfig::new(
                    "google",
                    "https://generativelanguage.googleapis.com/v1beta/openai",
                    "GEMINI_API_KEY",
                ),
                ProviderConfig::new(
                    "anthropic",
                    "https://api.anthropic.com/v1",
                    "ANTHROPIC_API_KEY",
                ),
            ],
            prompts,
            patterns: vec![Pattern::new("default", vec![Step::ai("@default")])],
            config_home,
        }
    }

    /// Convert a parsed config file, resolving relative prompt paths against
    /// `config_home`.
    pub fn from_file(file: ConfigFile, config_home: impl Into<PathBuf>) -> Self {
        let mut config = Self::empty(config_home);
        config.general = file.general;
        config.providers = file.providers;
        config.patterns = file.patterns;
        config.prompts = file
            .prompts
            .into_iter()
            .map(|(name, table)| {
                let prompt = Prompt::from_table(&name, table, &config.config_home);
                (name, prompt)
            })
            .collect();
        config
    }
}
