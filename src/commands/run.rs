//! Implementation of `mdrun <FILE>`.
//!
//! # What a run does
//!
//! 1. Reads the document, which must be UTF-8
//! 2. Runs every block that needs it, in document order
//! 3. Writes the document back atomically, only if anything changed
//!
//! Interpreters run in the document's directory, and generated images are
//! saved there. If the pass aborts, the document is not touched.

use crate::cli::RunArgs;
use crate::document::DocumentProcessor;
use crate::error::{MdrunError, Result};
use crate::exec::ProcessExecutor;
use crate::fs::atomic_write_file;
use crate::splice::ResultSplicer;
use crate::visualize::{DaliboClient, DisabledSubmitter, PlanSubmitter};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Execute the `mdrun <FILE>` command.
pub fn cmd_run(args: RunArgs) -> Result<()> {
    let path = resolve_document(&args.file)?;
    let input = read_document(&path)?;
    let work_dir = path.parent().ok_or_else(|| {
        MdrunError::UserError(format!("'{}' has no parent directory", path.display()))
    })?;

    info!(path = %path.display(), "processing document");

    let mut executor =
        ProcessExecutor::new().with_timeout(args.timeout.map(Duration::from_secs));
    let splicer = ResultSplicer::new(plan_submitter(&args));
    let output = DocumentProcessor::new(&mut executor, splicer, work_dir).process(&input)?;

    if output == input {
        info!(path = %path.display(), "document unchanged");
        return Ok(());
    }

    atomic_write_file(&path, &output)?;
    info!(path = %path.display(), "document updated");
    Ok(())
}

fn plan_submitter(args: &RunArgs) -> Box<dyn PlanSubmitter> {
    if args.no_submit {
        debug!("plan submission disabled");
        Box::new(DisabledSubmitter)
    } else {
        Box::new(DaliboClient::new(args.dalibo_url.as_str()))
    }
}

/// Check that `file` is an existing regular file and make its path absolute.
fn resolve_document(file: &Path) -> Result<PathBuf> {
    if !file.exists() {
        return Err(MdrunError::UserError(format!(
            "file not found: '{}'\n\
             Fix: check the path and try again.",
            file.display()
        )));
    }
    if !file.is_file() {
        return Err(MdrunError::UserError(format!(
            "'{}' is not a regular file",
            file.display()
        )));
    }

    fs::canonicalize(file).map_err(|e| {
        MdrunError::UserError(format!("cannot resolve '{}': {}", file.display(), e))
    })
}

fn read_document(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| {
        MdrunError::UserError(format!("cannot read '{}': {}", path.display(), e))
    })?;

    String::from_utf8(bytes).map_err(|_| {
        MdrunError::UserError(format!(
            "'{}' is not valid UTF-8\n\
             Fix: convert the file to UTF-8 first.",
            path.display()
        ))
    })
}
