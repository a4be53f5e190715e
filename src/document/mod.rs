//! Line-oriented processing of Markdown documents.
//!
//! A document is read once, front to back, through a [`LineCursor`]. Fence
//! lines open and close code blocks; when a block closes, the lines right
//! after it are inspected to find the results of an earlier run and to
//! decide whether the block runs again.
//!
//! # Trailing Artifacts
//!
//! ````text
//! ```bash
//! echo hi
//! ```
//!
//! ```RESULT
//! hi
//! ```
//! ````
//!
//! Besides RESULT blocks, a block may own a plan link line, a flamegraph
//! image line or a diagram image line. Ruby blocks carry their results
//! inside the block as `# >>` annotations.

pub mod annotation;
pub mod artifact;
mod cursor;
pub mod decision;
pub mod header;
mod scanner;


pub use cursor::LineCursor;
pub use scanner::DocumentProcessor;
