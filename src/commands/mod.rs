//! Command implementations for mdrun.
//!
//! mdrun has a single command, processing one document in place; the
//! dispatcher routes parsed arguments to it.

mod run;

use crate::cli::RunArgs;
use crate::error::Result;

/// Dispatch parsed arguments to their implementation.
pub fn dispatch(args: RunArgs) -> Result<()> {
    run::cmd_run(args)
}
