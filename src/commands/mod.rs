//! Command implementations for axon.
//!
//! Routes the parsed CLI to the handler for its mode. Handlers print results
//! to stdout; errors bubble up to `main`.

mod inspect;
mod run;

use crate::cli::{Cli, Mode};
use crate::config::{Config, config_home};
use crate::error::Result;
use std::borrow::Cow;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Dispatch a parsed command line to its implementation.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<()> {
    match cli.mode() {
        Mode::Run => run::cmd_run(&cli, cancel).await,
        Mode::Replay => run::cmd_replay(&cli, cancel).await,
        Mode::Explain => inspect::cmd_explain(&cli),
        Mode::List => inspect::cmd_list(&cli),
        Mode::Last => inspect::cmd_last(),
    }
}

/// Load the config named on the command line (or the default one) and apply
/// the `-m` / `-q` overrides.
fn load_config(path: Option<&Path>, model: Option<&str>, quiet: bool) -> Result<Config> {
    Ok(Config::load(path, config_home())?.with_overrides(model, quiet))
}

/// Print a result, ending it with a newline unless it is empty or already
/// ends with one.
fn print_output(output: &str) {
    print!("{}", line_terminated(output));
}

fn line_terminated(output: &str) -> Cow<'_, str> {
    if output.is_empty() || output.ends_with('\n') {
        Cow::Borrowed(output)
    } else {
        Cow::Owned(format!("{}\n", output))
    }
}
