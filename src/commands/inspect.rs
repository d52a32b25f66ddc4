//! Read-only commands: `--explain`, `--list`, and `--last`.

use super::{load_config, print_output};
use crate::cache::RunCache;
use crate::cli::Cli;
use crate::config::{Config, cache_home};
use crate::error::Result;
use crate::pattern::explain;

pub fn cmd_explain(cli: &Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref(), cli.model.as_deref(), cli.quiet)?;
    let pattern = config.pattern(&cli.pattern)?;
    print!("{}", explain(&pattern, &mut config)?);
    Ok(())
}

pub fn cmd_list(cli: &Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref(), None, false)?;
    print!("{}", format_listing(&mut config));
    Ok(())
}

pub fn cmd_last() -> Result<()> {
    print_output(&RunCache::new(cache_home()).last_output()?);
    Ok(())
}

fn format_listing(config: &mut Config) -> String {
    let mut out = String::from("Patterns:\n");
    for name in config.pattern_names() {
        out.push_str(&format!("  {}\n", name));
    }
    out.push_str("\nPrompts:\n");
    for name in config.prompt_names() {
        out.push_str(&format!("  @{}\n", name));
    }
    out
}
