//! CLI argument parsing for axon.
//!
//! Uses clap derive macros for declarative argument definitions. The
//! behaviour behind each mode lives in the `commands` module.

use clap::{ArgAction, ArgGroup, Parser};
use std::path::PathBuf;

/// Axon: run patterns of AI and shell steps.
///
/// A pattern is an ordered list of steps. AI steps send a rendered prompt to a
/// model; command steps run a shell command. Text piped into axon is
/// available to every step as {{.INPUT}}, and the words after the options as
/// {{.PROMPT}}.
#[derive(Parser, Debug)]
#[command(name = "axon")]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .args(["last", "replay", "explain", "list"])
        .multiple(false)
))]
pub struct Cli {
    /// Words joined into the {{.PROMPT}} binding.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub words: Vec<String>,

    /// Config file (default: <config dir>/axon/config.toml).
    #[arg(short, long, value_name = "PATH", env = "AXON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pattern to run, or @name to run a single prompt.
    #[arg(short, long, default_value = "default")]
    pub pattern: String,

    /// Model as provider/model, overriding every step.
    #[arg(short, long, value_name = "PROVIDER/MODEL")]
    pub model: Option<String>,

    /// Hide the spinner and command stderr.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the output of the previous run.
    #[arg(long)]
    pub last: bool,

    /// Run the previous pattern again with the same input.
    #[arg(long)]
    pub replay: bool,

    /// Describe the pattern instead of running it.
    #[arg(long)]
    pub explain: bool,

    /// List pattern and prompt names.
    #[arg(long)]
    pub list: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// What a single invocation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Run,
    Explain,
    List,
    Last,
    Replay,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    pub fn mode(&self) -> Mode {
        if self.last {
            Mode::Last
        } else if self.replay {
            Mode::Replay
        } else if self.explain {
            Mode::Explain
        } else if self.list {
            Mode::List
        } else {
            Mode::Run
        }
    }

    /// Positional words joined by a space, or `None` when there are none.
    pub fn prompt(&self) -> Option<String> {
        (!self.words.is_empty()).then(|| self.words.join(" "))
    }
}
