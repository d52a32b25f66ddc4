//! Sequential pattern execution and dry-run explanation.

use super::bindings::Bindings;
use super::step::{Pattern, StepKind};
use super::{StepContext, StepExecutor};
use crate::client::ClientCache;
use crate::config::Config;
use crate::error::Result;
use std::fmt::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs patterns step by step, sharing one client cache across steps.
pub struct PatternRunner {
    clients: ClientCache,
    cancel: CancellationToken,
}

impl PatternRunner {
    pub fn new(clients: ClientCache, cancel: CancellationToken) -> Self {
        Self { clients, cancel }
    }

    /// Run every step of `pattern` in order and return the final pipe value.
    ///
    /// `INPUT` and the pipe start as `input`, `PROMPT` as `prompt`. Each step's
    /// output goes to its named binding, or replaces the pipe when unnamed.
    /// The first failing step aborts the run.
    pub async fn run(
        &mut self,
        pattern: &Pattern,
        config: &mut Config,
        input: Option<&str>,
        prompt: Option<&str>,
    ) -> Result<String> {
        let mut bindings = Bindings::new(input, prompt);
        let mut ctx = StepContext {
            config,
            clients: &mut self.clients,
            cancel: &self.cancel,
        };

        info!(pattern = %pattern.name, steps = pattern.steps.len(), "running pattern");

        for (index, step) in pattern.steps.iter().enumerate() {
            debug!(step = index + 1, kind = step.kind_name(), "starting step");

            let executor: &dyn StepExecutor = match &step.kind {
                StepKind::Ai(ai) => ai,
                StepKind::Command(cmd) => cmd,
            };
            let output = executor.execute(&mut ctx, &bindings).await?;

            match &step.output {
                Some(name) => {
                    debug!(step = index + 1, output = %name, "storing step output");
                    bindings.set(name.as_str(), output);
                }
                None => bindings.set_pipe(output),
            }
        }

        Ok(bindings.pipe().to_string())
    }

    #[cfg(test)]
    pub fn clients(&self) -> &ClientCache {
        &self.clients
    }
}

/// Describe what running `pattern` would do, without running anything.
pub fn explain(pattern: &Pattern, config: &mut Config) -> Result<String> {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "Pattern: {}\n", pattern.name);

    for (index, step) in pattern.steps.iter().enumerate() {
        let _ = writeln!(out, "Step {}:", index + 1);
        match &step.kind {
            StepKind::Ai(ai) => {
                let _ = writeln!(out, "  Type: AI Step");
                let _ = writeln!(out, "  Model: {}", config.select_model(ai.model.as_deref()));
                let _ = writeln!(out, "  Prompt: {}", ai.prompt);
                if let Some(name) = ai.prompt.strip_prefix('@') {
                    match config.find_prompt(name) {
                        Some(found) => {
                            let _ = writeln!(out, "  Stored in: {}", found.source());
                        }
                        None => {
                            let _ = writeln!(out, "  (Prompt not found)");
                        }
                    }
                }
            }
            StepKind::Command(cmd) => {
                let _ = writeln!(out, "  Type: Command Step");
                let _ = writeln!(out, "  Command: `{}`", cmd.command);
                if cmd.pipe_in {
                    let _ = writeln!(out, "  Input: piped from previous step");
                }
                if cmd.tty {
                    let _ = writeln!(out, "  Output: terminal");
                }
            }
        }
        if let Some(name) = &step.output {
            let _ = writeln!(out, "  ==> ${}", name);
        }
        out.push('\n');
    }

    Ok(out)
}
