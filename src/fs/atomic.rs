//! Atomic write-back of processed documents.
//!
//! # Implementation Strategy
//!
//! 1. Write content to a temporary file in the same directory
//! 2. Sync the file to disk (fsync)
//! 3. Rename it over the original file
//!
//! Some environments (certain mounts, containers, restrictive directory
//! permissions) reject the rename with `EXDEV` or `EACCES` even though the
//! paths look local. For those cases we fall back to copying the temporary
//! file over the target and deleting it. If the fallback fails too, the
//! error is returned: a silent non-write is never acceptable.
//!
//! On crash a temporary file may remain (named `.{filename}.tmp`).

use crate::error::{MdrunError, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Atomically write bytes to a file.
///
/// # Example
///
/// ```no_run
/// use mdrun::fs::atomic_write;
/// use std::path::Path;
///
/// atomic_write(Path::new("notes.md"), b"# Notes\n")?;
/// # Ok::<(), mdrun::error::MdrunError>(())
/// ```
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            MdrunError::WriteError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = generate_temp_path(path)?;
    write_and_sync(&temp_path, content)?;
    replace_with(&temp_path, path)
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Generate a temporary file path in the same directory as the target.
fn generate_temp_path(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            MdrunError::WriteError(format!("invalid file path '{}'", target.display()))
        })?;

    Ok(parent.join(format!(".{}.tmp", filename)))
}

/// Write content to a file and sync to disk.
fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        MdrunError::WriteError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content).map_err(|e| {
        let _ = fs::remove_file(path);
        MdrunError::WriteError(format!("failed to write to temporary file: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(path);
        MdrunError::WriteError(format!("failed to sync temporary file to disk: {}", e))
    })?;

    Ok(())
}

/// Move the temporary file over the target, falling back to copy + delete.
fn replace_with(source: &Path, target: &Path) -> Result<()> {
    match fs::rename(source, target) {
        Ok(()) => {
            if let Some(parent) = target.parent()
                && let Ok(dir) = File::open(parent)
            {
                let _ = dir.sync_all();
            }
            Ok(())
        }
        Err(e) if needs_copy_fallback(&e) => {
            warn!(
                target = %target.display(),
                error = %e,
                "atomic rename failed, falling back to copy and delete"
            );
            copy_then_delete(source, target, e)
        }
        Err(e) => {
            let _ = fs::remove_file(source);
            Err(MdrunError::WriteError(format!(
                "failed to atomically replace '{}': {}",
                target.display(),
                e
            )))
        }
    }
}

fn copy_then_delete(source: &Path, target: &Path, original_error: io::Error) -> Result<()> {
    if let Err(e) = fs::copy(source, target) {
        let _ = fs::remove_file(source);
        return Err(MdrunError::WriteError(format!(
            "failed to copy over '{}': {} (original rename error: {})",
            target.display(),
            e,
            original_error
        )));
    }

    // The target already holds the new content; a leftover temp file is only clutter.
    if let Err(e) = fs::remove_file(source) {
        warn!(
            temp = %source.display(),
            error = %e,
            "failed to remove temporary file after copy"
        );
    }

    Ok(())
}

fn needs_copy_fallback(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
        || err.kind() == io::ErrorKind::PermissionDenied
        || err.raw_os_error() == Some(18)
}
