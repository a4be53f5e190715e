//! Filesystem utilities for mdrun.
//!
//! The processed document is always written back through [`atomic_write`],
//! so an interrupted run never leaves a half-written file behind.

pub mod atomic;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
