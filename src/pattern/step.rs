//! Pattern and step definitions.
//!
//! Steps are deserialized through a flat table ([`StepTable`]) and validated
//! into the [`StepKind`] sum type, so a step that is both (or neither) an AI
//! step and a command step never reaches the runner.

use super::template::is_identifier;
use crate::error::AxonError;
use serde::{Deserialize, Serialize};

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Pattern {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Build the one-step pattern used when `-p @name` refers to a prompt.
    ///
    /// The leading `@` is optional in `name`; the resulting pattern is always
    /// named `@name` and its step references `@name`.
    pub fn single_prompt(name: &str) -> Self {
        let reference = format!("@{}", name.trim_start_matches('@'));
        Self::new(reference.clone(), vec![Step::ai(reference)])
    }
}

/// One unit of work in a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StepTable", into = "StepTable")]
pub struct Step {
    pub kind: StepKind,
    /// Binding that receives this step's output. `None` routes it to the pipe.
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Ai(AiStep),
    Command(CommandStep),
}

/// Sends a rendered prompt to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiStep {
    /// `@name` reference or inline system text.
    pub prompt: String,
    /// `provider/model`, overriding the configured default.
    pub model: Option<String>,
}

/// Runs a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    pub command: String,
    /// Feed the pipe variable to the command's stdin.
    pub pipe_in: bool,
    /// Send the command's stdout to the controlling terminal instead of
    /// capturing it.
    pub tty: bool,
}

impl Step {
    pub fn ai(prompt: impl Into<String>) -> Self {
        Self {
            kind: StepKind::Ai(AiStep {
                prompt: prompt.into(),
                model: None,
            }),
            output: None,
        }
    }

    #[cfg(test)]
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            kind: StepKind::Command(CommandStep {
                command: command.into(),
                pipe_in: false,
                tty: false,
            }),
            output: None,
        }
    }

    #[cfg(test)]
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.output = Some(name.into());
        self
    }

    #[cfg(test)]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        if let StepKind::Ai(step) = &mut self.kind {
            step.model = Some(model.into());
        }
        self
    }

    /// Set `pipe_in` on a command step. No effect on AI steps.
    #[cfg(test)]
    pub fn piped(mut self) -> Self {
        if let StepKind::Command(step) = &mut self.kind {
            step.pipe_in = true;
        }
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            StepKind::Ai(_) => "ai",
            StepKind::Command(_) => "command",
        }
    }
}

/// Flat on-disk shape of a step.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StepTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pipe_in: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tty: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

impl TryFrom<StepTable> for Step {
    type Error = AxonError;

    fn try_from(table: StepTable) -> Result<Self, Self::Error> {
        if let Some(name) = &table.output
            && !is_identifier(name)
        {
            return Err(AxonError::InvalidStep(format!(
                "output name '{}' must match [A-Za-z_][A-Za-z0-9_]*",
                name
            )));
        }

        let kind = match (table.prompt, table.command) {
            (Some(_), Some(_)) => {
                return Err(AxonError::InvalidStep(
                    "a step must set either 'prompt' or 'command', not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(AxonError::InvalidStep(
                    "a step must set either 'prompt' or 'command'".to_string(),
                ));
            }
            (Some(prompt), None) => {
                if table.pipe_in.is_some() || table.tty.is_some() {
                    return Err(AxonError::InvalidStep(
                        "'pipe_in' and 'tty' only apply to command steps".to_string(),
                    ));
                }
                if prompt.trim().is_empty() {
                    return Err(AxonError::InvalidStep(
                        "'prompt' must not be empty".to_string(),
                    ));
                }
                StepKind::Ai(AiStep {
                    prompt,
                    model: table.model,
                })
            }
            (None, Some(command)) => {
                if table.model.is_some() {
                    return Err(AxonError::InvalidStep(
                        "'model' only applies to AI steps".to_string(),
                    ));
                }
                StepKind::Command(CommandStep {
                    command,
                    pipe_in: table.pipe_in.unwrap_or(false),
                    tty: table.tty.unwrap_or(false),
                })
            }
        };

        Ok(Step {
            kind,
            output: table.output,
        })
    }
}

impl From<Step> for StepTable {
    fn from(step: Step) -> Self {
        let mut table = StepTable {
            output: step.output,
            ..Default::default()
        };
        match step.kind {
            StepKind::Ai(ai) => {
                table.prompt = Some(ai.prompt);
                table.model = ai.model;
            }
            StepKind::Command(cmd) => {
                table.command = Some(cmd.command);
                table.pipe_in = cmd.pipe_in.then_some(true);
                table.tty = cmd.tty.then_some(true);
            }
        }
        table
    }
}
