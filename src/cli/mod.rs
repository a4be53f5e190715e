//! CLI argument parsing for mdrun.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the argument structure; the implementation is in
//! the `commands` module.

use crate::visualize::DEFAULT_ENDPOINT;
use clap::{ArgAction, Args, Parser};
use std::path::PathBuf;

/// mdrun: run the code blocks of a Markdown file and write their results
/// back into it.
///
/// Results are stored in the document itself, so running mdrun again only
/// executes blocks that have no result yet or ask for `rerun`.
#[derive(Parser, Debug)]
#[command(name = "mdrun")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,

    /// Log more (repeat for trace output).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Arguments for processing a document.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Markdown file to process in place.
    pub file: PathBuf,

    /// Never submit query plans to the visualization service.
    #[arg(long)]
    pub no_submit: bool,

    /// Query plan visualization service.
    #[arg(long, value_name = "URL", default_value = DEFAULT_ENDPOINT)]
    pub dalibo_url: String,

    /// Kill a block's interpreter after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Log filter directive implied by `-q` / `-v`.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
