//! Running block content through an interpreter.
//!
//! The document core only talks to [`ExecutionService`]. The real
//! implementation, [`ProcessExecutor`], spawns the interpreter named by the
//! language registry, falling back to a Postgres container for psql; tests
//! substitute a scripted service.

mod docker;
mod process;


pub use process::ProcessExecutor;

use crate::error::Result;
use crate::languages::InvocationOptions;
use std::path::{Path, PathBuf};

/// What to run, and where.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRequest<'a> {
    /// Canonical language of the block.
    pub language: &'a str,
    pub content: &'a str,
    /// Directory of the document; temporary and output files go here.
    pub work_dir: &'a Path,
    pub options: InvocationOptions,
}

/// Captured result of running a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; `None` when the process was killed by a signal or timed out.
    pub exit_code: Option<i32>,
    /// File produced by the interpreter (e.g. a rendered diagram).
    pub artifact_path: Option<PathBuf>,
}

impl ExecutionOutcome {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
            ..Self::default()
        }
    }

    pub fn failure(exit_code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            artifact_path: None,
        }
    }

    /// Outcome reported for a language with no registry entry.
    pub fn unsupported(language: &str) -> Self {
        Self::failure(Some(1), format!("ERROR: Unsupported language: {}", language), "")
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit status as shown in failure reports.
    pub fn status_label(&self) -> String {
        match self.exit_code {
            Some(code) => code.to_string(),
            None => "terminated".to_string(),
        }
    }
}

/// Runs code blocks. Called once per executed block, strictly in sequence.
pub trait ExecutionService {
    /// Run a block.
    ///
    /// A block that runs and fails is *not* an error: it is an outcome with
    /// a non-zero exit code. `Err` is reserved for problems that make the
    /// whole document pass pointless, such as a missing interpreter.
    fn execute(&mut self, request: &ExecutionRequest<'_>) -> Result<ExecutionOutcome>;
}
