//! mdrun: run the code blocks of a Markdown file in place.
//!
//! This is the main entry point for the `mdrun` CLI. It parses arguments,
//! sets up logging, dispatches to the command handler, and handles errors
//! with proper exit codes.

use mdrun::cli::Cli;
use mdrun::{commands, exit_codes};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the `-q`/`-v` log filter.
const LOG_ENV: &str = "MDRUN_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(&cli);

    match commands::dispatch(cli.run) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
