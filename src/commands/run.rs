//! Running patterns: the default mode and `--replay`.

use super::{load_config, print_output};
use crate::cache::{RunCache, RunData, RunFlags};
use crate::cli::Cli;
use crate::client::ClientCache;
use crate::config::{Config, cache_home};
use crate::error::{AxonError, Result};
use crate::pattern::PatternRunner;
use chrono::Utc;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn cmd_run(cli: &Cli, cancel: CancellationToken) -> Result<()> {
    let mut config = load_config(cli.config.as_deref(), cli.model.as_deref(), cli.quiet)?;
    let pattern = config.pattern(&cli.pattern)?;
    let input = read_stdin().await?;
    let prompt = cli.prompt();

    let run = RunData {
        pattern,
        flags: RunFlags {
            pattern: cli.pattern.clone(),
            model: cli.model.clone(),
            quiet: cli.quiet,
            config: cli.config.as_deref().map(absolute_config_path),
        },
        input: input.unwrap_or_default(),
        prompt: prompt.unwrap_or_default(),
        saved_at: Utc::now(),
    };

    let output = execute(&run, &mut config, cancel).await?;
    print_output(&output);

    let cache = RunCache::new(cache_home());
    record(&cache, &output, Some(&run));
    Ok(())
}

/// Re-run the previous pattern with its stored input and prompt.
///
/// `-m` and `-c` given now take precedence over the stored flags. `-q` can
/// only switch quiet on: a run stored as quiet replays quiet.
pub async fn cmd_replay(cli: &Cli, cancel: CancellationToken) -> Result<()> {
    let cache = RunCache::new(cache_home());
    let run = cache.last_run()?;
    info!(pattern = %run.pattern.name, saved_at = %run.saved_at, "replaying last run");

    let config_path = cli.config.as_deref().or(run.flags.config.as_deref());
    let model = cli.model.as_deref().or(run.flags.model.as_deref());
    let quiet = cli.quiet || run.flags.quiet;
    let mut config = load_config(config_path, model, quiet)?;

    let output = execute(&run, &mut config, cancel).await?;
    print_output(&output);

    record(&cache, &output, None);
    Ok(())
}

async fn execute(run: &RunData, config: &mut Config, cancel: CancellationToken) -> Result<String> {
    let mut runner = PatternRunner::new(ClientCache::new(), cancel);
    runner
        .run(
            &run.pattern,
            config,
            non_empty(&run.input),
            non_empty(&run.prompt),
        )
        .await
}

/// Save the output (and run data, when given). Failures are only logged.
fn record(cache: &RunCache, output: &str, run: Option<&RunData>) {
    if let Err(e) = cache.save_output(output) {
        warn!(error = %e, dir = %cache.dir().display(), "failed to cache output");
    }
    if let Some(run) = run
        && let Err(e) = cache.save_run(run)
    {
        warn!(error = %e, dir = %cache.dir().display(), "failed to cache run data");
    }
}

/// Read all of stdin, unless it is a terminal.
async fn read_stdin() -> Result<Option<String>> {
    if std::io::stdin().is_terminal() {
        return Ok(None);
    }

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .map_err(|e| AxonError::UserError(format!("failed to read stdin: {}", e)))?;
    Ok(Some(input))
}

/// Make a `-c` path absolute so a replay from another directory finds the
/// same file. Falls back to the path as given.
fn absolute_config_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Pattern, Step};
    use tempfile::TempDir;

    fn run_data(pattern: Pattern, input: &str, prompt: &str) -> RunData {
        RunData {
            pattern,
            flags: RunFlags::default(),
            input: input.to_string(),
            prompt: prompt.to_string(),
            saved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_execute_uses_stored_input_and_prompt() {
        let home = TempDir::new().unwrap();
        let mut config = Config::builtin(home.path()).with_overrides(None, true);
        let pattern = Pattern::new(
            "echo",
            vec![Step::command("printf '%s|%s' {{.INPUT}} {{.PROMPT}}")],
        );

        let output = execute(
            &run_data(pattern, "from stdin", "from words"),
            &mut config,
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(output, "from stdin|from words");
    }

    #[test]
    fn test_config_path_is_stored_absolute() {
        let stored = absolute_config_path(Path::new("conf/axon.toml"));
        assert!(stored.is_absolute());
        assert!(stored.ends_with("conf/axon.toml"));

        let already = absolute_config_path(Path::new("/etc/axon.toml"));
        assert_eq!(already, PathBuf::from("/etc/axon.toml"));
    }

    #[test]
    fn test_record_writes_output_and_run() {
        let dir = TempDir::new().unwrap();
        let cache = RunCache::new(dir.path());
        let run = run_data(Pattern::new("p", Vec::new()), "in", "");

        record(&cache, "result", Some(&run));

        assert_eq!(cache.last_output().unwrap(), "result");
        assert_eq!(cache.last_run().unwrap(), run);
    }

    #[test]
    fn test_record_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        record(&RunCache::new(blocker.join("cache")), "result", None);
    }
}
