//! mdrun: live Markdown documents.
//!
//! Fenced code blocks in supported languages are executed and their output
//! is written back into the document right after each block. Results stay
//! in the file, so processing the document again leaves finished blocks
//! alone unless they ask to be rerun.
//!
//! The pass itself lives in [`document`]; interpreters are reached through
//! [`exec::ExecutionService`] and results are rendered by [`splice`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod exec;
pub mod exit_codes;
pub mod fs;
pub mod languages;
pub mod splice;
pub mod visualize;

#[cfg(test)]
mod test_support;
