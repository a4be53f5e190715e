//! Error types for mdrun.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Only conditions that must stop the whole run live here; per-block problems
//! (failed executions, bad frontmatter, unreachable visualization service) are
//! logged and folded into the document instead.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for mdrun operations.
#[derive(Error, Debug)]
pub enum MdrunError {
    /// User provided invalid arguments or an unusable document.
    #[error("{0}")]
    UserError(String),

    /// No candidate interpreter for a language could be spawned.
    #[error(
        "{program} command not found (needed for '{language}' blocks)\n\
         Fix: install it or make sure it is in your PATH."
    )]
    MissingInterpreter { language: String, program: String },

    /// The interpreter was found but could not be driven.
    #[error("Execution failed: {0}")]
    ExecutionError(String),

    /// The processed document could not be written back.
    #[error("Write failed: {0}")]
    WriteError(String),
}

impl MdrunError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            MdrunError::UserError(_) => exit_codes::USER_ERROR,
            MdrunError::MissingInterpreter { .. } => exit_codes::MISSING_INTERPRETER,
            MdrunError::ExecutionError(_) => exit_codes::EXECUTION_FAILURE,
            MdrunError::WriteError(_) => exit_codes::WRITE_FAILURE,
        }
    }
}

/// Result type alias for mdrun operations.
pub type Result<T> = std::result::Result<T, MdrunError>;
