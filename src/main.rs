//! Axon: run patterns of AI and shell steps from the command line.
//!
//! This is the main entry point for the `axon` CLI. It parses arguments,
//! sets up logging and Ctrl-C cancellation, dispatches to the command
//! handler, and maps errors to exit codes.

mod cache;
mod cli;
mod client;
mod commands;
mod config;
mod error;
mod exit_codes;
mod fs;
mod logging;
mod pattern;
mod spinner;

use cli::Cli;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init_logging(cli.verbose);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    match commands::dispatch(cli, cancel).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
