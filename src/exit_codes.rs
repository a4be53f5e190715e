//! Exit code constants for the mdrun CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, missing or unreadable document)
//! - 2: A required interpreter binary is not installed
//! - 3: An interpreter could not be driven (pipes, temp files)
//! - 4: The processed document could not be written back

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, missing file, or non-UTF-8 input.
pub const USER_ERROR: i32 = 1;

/// None of a language's candidate interpreters could be found.
pub const MISSING_INTERPRETER: i32 = 2;

/// The interpreter was found but running it failed at the OS level.
pub const EXECUTION_FAILURE: i32 = 3;

/// Write-back failed, including the copy fallback.
pub const WRITE_FAILURE: i32 = 4;
