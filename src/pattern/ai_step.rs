//! AI step execution: prompt resolution, message building, and streaming.

use super::bindings::Bindings;
use super::step::AiStep;
use super::template::render_template;
use super::{StepContext, StepExecutor};
use crate::client::{ChatMessage, FinishEvent, ModelRef, Role, collect};
use crate::config::{Config, Prompt, RefusalPolicy};
use crate::error::{AxonError, Result};
use crate::spinner::Spinner;
use async_trait::async_trait;
use tracing::{debug, info, trace, warn};

const SPINNER_MESSAGE: &str = "Thinking...";

impl AiStep {
    /// Resolve the step's prompt: `@name` looks up a stored prompt, anything
    /// else is used as inline system text.
    pub fn resolve_prompt(&self, config: &mut Config) -> Result<Prompt> {
        match self.prompt.strip_prefix('@') {
            Some(name) => config.prompt(name).cloned(),
            None => Ok(Prompt::inline("inline", Some(&self.prompt), None)),
        }
    }

    /// Render `prompt` against raw bindings into the message list.
    ///
    /// Without a user template, `PROMPT` and then `INPUT` become user
    /// messages when non-empty. A list with no user message is an error.
    pub fn build_messages(&self, prompt: &Prompt, bindings: &Bindings) -> Result<Vec<ChatMessage>> {
        let vars = bindings.as_map();
        let mut messages = Vec::new();

        if let Some(system) = &prompt.system {
            let rendered = render_template(system, vars).map_err(|source| AxonError::Template {
                context: format!("system prompt of {}", self.prompt_label()),
                source,
            })?;
            if !rendered.is_empty() {
                messages.push(ChatMessage::system(rendered));
            }
        }

        match &prompt.user {
            Some(user) => {
                let rendered = render_template(user, vars).map_err(|source| AxonError::Template {
                    context: format!("user prompt of {}", self.prompt_label()),
                    source,
                })?;
                messages.push(ChatMessage::user(rendered));
            }
            None => {
                for value in [bindings.prompt(), bindings.input()] {
                    if !value.is_empty() {
                        messages.push(ChatMessage::user(value));
                    }
                }
            }
        }

        if !messages.iter().any(|m| m.role == Role::User) {
            return Err(AxonError::NoUserMessage {
                prompt: self.prompt_label(),
            });
        }

        Ok(messages)
    }

    fn prompt_label(&self) -> String {
        if self.prompt.starts_with('@') {
            self.prompt.clone()
        } else {
            "inline prompt".to_string()
        }
    }
}

#[async_trait]
impl StepExecutor for AiStep {
    async fn execute(&self, ctx: &mut StepContext<'_>, bindings: &Bindings) -> Result<String> {
        let prompt = self.resolve_prompt(ctx.config)?;
        let messages = self.build_messages(&prompt, bindings)?;

        let model = ModelRef::parse(&ctx.config.select_model(self.model.as_deref()))?;
        let config = &*ctx.config;
        let cancel = ctx.cancel;
        let client = ctx
            .clients
            .get_or_connect(&model, || config.client_options(&model, cancel))
            .await?;

        info!(model = %model, messages = messages.len(), "sending prompt");

        let spinner = (!config.quiet()).then(|| Spinner::start(SPINNER_MESSAGE));
        let policy = config.refusal_policy();

        let result = async {
            let fragments = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AxonError::Cancelled),
                fragments = client.stream_chat(&messages) => fragments?,
            };
            collect(
                fragments,
                cancel,
                |chunk| trace!(content = chunk.content(), "fragment"),
                |event| on_finish(event, policy),
            )
            .await
        }
        .await;

        if let Some(spinner) = spinner {
            spinner.stop();
        }

        let completion = result?;
        debug!(
            id = %completion.id,
            finish_reason = completion.finish_reason.as_deref().unwrap_or(""),
            "completion received"
        );
        Ok(completion.content)
    }
}

fn on_finish(event: FinishEvent, policy: RefusalPolicy) -> Result<()> {
    match event {
        FinishEvent::Content(text) => {
            debug!(chars = text.len(), "content finished");
            Ok(())
        }
        FinishEvent::Refusal(text) => match policy {
            RefusalPolicy::Report => {
                warn!(refusal = %text, "model refused the request");
                Ok(())
            }
            RefusalPolicy::Abort => Err(AxonError::Refusal(text)),
        },
        FinishEvent::ToolCalls(calls) => {
            for call in &calls {
                debug!(index = call.index, name = %call.name, arguments = %call.arguments, "tool call finished");
            }
            Ok(())
        }
    }
}
