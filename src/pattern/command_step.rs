//! Command step execution.
//!
//! Runs a rendered command through `$SHELL -c`, optionally feeding the pipe
//! variable on stdin, and captures stdout as the step output. Trailing
//! newlines are stripped from the capture, as shell `$(...)` does.

use super::bindings::Bindings;
use super::step::CommandStep;
use super::template::render_template;
use super::{StepContext, StepExecutor};
use crate::config::user_shell;
use crate::error::{AxonError, Result};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info};

const TTY_PATH: &str = "/dev/tty";

impl CommandStep {
    /// Render the command with every binding shell-quoted.
    pub fn render(&self, bindings: &Bindings) -> Result<String> {
        render_template(&self.command, &bindings.shell_escaped()).map_err(|source| {
            AxonError::Template {
                context: "command".to_string(),
                source,
            }
        })
    }
}

#[async_trait]
impl StepExecutor for CommandStep {
    async fn execute(&self, ctx: &mut StepContext<'_>, bindings: &Bindings) -> Result<String> {
        let command = self.render(bindings)?;
        let shell = user_shell();
        let quiet = ctx.config.quiet();

        info!(shell = %shell, command = %command, "running command");

        let mut cmd = Command::new(&shell);
        cmd.arg("-c").arg(&command).kill_on_drop(true);
        cmd.stdin(if self.pipe_in {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stderr(if quiet {
            Stdio::null()
        } else {
            Stdio::inherit()
        });

        let tty = if self.tty { open_tty() } else { None };
        match tty {
            Some(file) => cmd.stdout(Stdio::from(file)),
            None => cmd.stdout(Stdio::piped()),
        };

        let mut child = cmd.spawn().map_err(|e| {
            AxonError::Command(format!("failed to spawn '{} -c {}': {}", shell, command, e))
        })?;

        // Feed stdin and drain stdout concurrently so neither pipe can fill
        // up and stall the child.
        let writer = match (self.pipe_in, child.stdin.take()) {
            (true, Some(mut stdin)) => {
                let input = bindings.pipe().to_string();
                Some(tokio::spawn(async move {
                    // The child may exit without reading; a broken pipe is fine.
                    let _ = stdin.write_all(input.as_bytes()).await;
                }))
            }
            _ => None,
        };
        let reader = child.stdout.take().map(|mut stdout| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                stdout.read_to_end(&mut buf).await.map(|_| buf)
            })
        });

        let status = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => {
                debug!(command = %command, "cancelled, killing command");
                let _ = child.kill().await;
                return Err(AxonError::Cancelled);
            }
            status = child.wait() => status.map_err(|e| {
                AxonError::Command(format!("failed to wait for '{}': {}", command, e))
            })?,
        };

        if let Some(writer) = writer {
            let _ = writer.await;
        }

        let stdout = match reader {
            Some(reader) => reader
                .await
                .map_err(|e| AxonError::Command(format!("output reader failed: {}", e)))?
                .map_err(|e| AxonError::Command(format!("failed to read output: {}", e)))?,
            None => Vec::new(),
        };

        if !status.success() {
            return Err(AxonError::Command(format!(
                "'{}' exited with {}",
                command, status
            )));
        }

        debug!(bytes = stdout.len(), "command finished");
        let mut output = String::from_utf8_lossy(&stdout).into_owned();
        trim_trailing_newlines(&mut output);
        Ok(output)
    }
}

fn trim_trailing_newlines(output: &mut String) {
    let kept = output.trim_end_matches(['\n', '\r']).len();
    output.truncate(kept);
}

/// Open the controlling terminal for output, or `None` to fall back to
/// capturing.
fn open_tty() -> Option<File> {
    match OpenOptions::new().write(true).open(TTY_PATH) {
        Ok(file) => Some(file),
        Err(e) => {
            debug!(error = %e, "no controlling terminal, capturing output instead");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientCache;
    use crate::config::Config;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn command(text: &str) -> CommandStep {
        CommandStep {
            command: text.to_string(),
            pipe_in: false,
            tty: false,
        }
    }

    async fn run(step: &CommandStep, bindings: &Bindings) -> Result<String> {
        let home = TempDir::new().unwrap();
        let mut config = Config::builtin(home.path()).with_overrides(None, true);
        let mut clients = ClientCache::new();
        let cancel = CancellationToken::new();
        let mut ctx = StepContext {
            config: &mut config,
            clients: &mut clients,
            cancel: &cancel,
        };
        step.execute(&mut ctx, bindings).await
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let output = run(&command("echo 'hello world'"), &Bindings::new(None, None))
            .await
            .unwrap();
        assert_eq!(output, "hello world");
    }

    #[tokio::test]
    async fn test_renders_bindings() {
        let mut bindings = Bindings::new(None, None);
        bindings.set("NAME", "axon");
        let output = run(&command("echo {{.NAME}}-ok"), &bindings).await.unwrap();
        assert_eq!(output, "axon-ok");
    }

    #[tokio::test]
    async fn test_pipe_in_feeds_stdin() {
        let mut step = command("cat");
        step.pipe_in = true;
        let output = run(&step, &Bindings::new(Some("piped input"), None))
            .await
            .unwrap();
        assert_eq!(output, "piped input");
    }

    #[tokio::test]
    async fn test_stdin_is_empty_without_pipe_in() {
        let output = run(&command("cat"), &Bindings::new(Some("ignored"), None))
            .await
            .unwrap();
        assert_eq!(output, "");
    }

    #[tokio::test]
    async fn test_pipe_in_tolerates_command_ignoring_stdin() {
        let mut step = command("echo done");
        step.pipe_in = true;
        let big = "x".repeat(1 << 20);
        let output = run(&step, &Bindings::new(Some(&big), None)).await.unwrap();
        assert_eq!(output, "done");
    }

    #[tokio::test]
    async fn test_only_trailing_newlines_are_stripped() {
        let step = command("printf '  two\\n\\nlines  \\n\\n\\n'");
        let output = run(&step, &Bindings::new(None, None)).await.unwrap();
        assert_eq!(output, "  two\n\nlines  ");
    }

    #[test]
    fn test_trim_trailing_newlines() {
        let mut crlf = "line\r\n".to_string();
        trim_trailing_newlines(&mut crlf);
        assert_eq!(crlf, "line");

        let mut blank = "\n\n".to_string();
        trim_trailing_newlines(&mut blank);
        assert_eq!(blank, "");
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let err = run(&command("echo partial; exit 3"), &Bindings::new(None, None))
            .await
            .unwrap_err();
        match err {
            AxonError::Command(msg) => assert!(msg.contains("exit status: 3")),
            other => panic!("expected Command, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_values_cannot_inject_commands() {
        let mut bindings = Bindings::new(None, None);
        bindings.set("X", "'; echo pwned; '");
        let output = run(&command("printf '%s' {{.X}}"), &bindings)
            .await
            .unwrap();
        assert_eq!(output, "'; echo pwned; '");
    }

    #[tokio::test]
    async fn test_input_with_quotes_and_dollars_survives() {
        let bindings = Bindings::new(Some("it's $HOME `id` \"q\""), None);
        let output = run(&command("printf '%s' {{.INPUT}}"), &bindings)
            .await
            .unwrap();
        assert_eq!(output, "it's $HOME `id` \"q\"");
    }

    #[tokio::test]
    async fn test_malformed_command_template() {
        let err = run(&command("echo {{ if .X }}"), &Bindings::new(None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AxonError::Template { ref context, .. } if context == "command"));
    }

    #[tokio::test]
    async fn test_cancel_kills_child() {
        let home = TempDir::new().unwrap();
        let mut config = Config::builtin(home.path()).with_overrides(None, true);
        let mut clients = ClientCache::new();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let step = command("sleep 30");
        let mut ctx = StepContext {
            config: &mut config,
            clients: &mut clients,
            cancel: &cancel,
        };
        let started = std::time::Instant::now();
        let err = step
            .execute(&mut ctx, &Bindings::new(None, None))
            .await
            .unwrap_err();

        assert!(matches!(err, AxonError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
