//! Patterns and their execution.
//!
//! A [`Pattern`] is an ordered list of steps. Each step is either an AI step
//! (render a prompt, stream a completion) or a command step (render a shell
//! command, capture its stdout). Steps communicate through [`Bindings`].

mod ai_step;
mod bindings;
mod command_step;
mod runner;
mod step;
mod template;

use crate::client::ClientCache;
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use bindings::Bindings;
pub use runner::{PatternRunner, explain};
pub use step::{Pattern, Step};
pub use template::TemplateError;

/// Everything a step may touch besides the bindings.
pub struct StepContext<'a> {
    pub config: &'a mut Config,
    pub clients: &'a mut ClientCache,
    pub cancel: &'a CancellationToken,
}

/// One kind of step.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Run the step and return its output text.
    async fn execute(&self, ctx: &mut StepContext<'_>, bindings: &Bindings) -> Result<String>;
}
