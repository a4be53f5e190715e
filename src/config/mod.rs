//! Per-block configuration for mdrun.
//!
//! Options reach a code block through four layers, highest priority first:
//!
//! 1. `key=value` tokens on the fence opener (`` ```psql explain=false ``)
//! 2. bare keywords on the fence opener (`` ```psql explain ``), meaning `true`
//! 3. per-language defaults from the document frontmatter
//! 4. global defaults from the document frontmatter
//!
//! with built-in fallbacks below all of them. Language aliases declared in the
//! frontmatter are resolved before any lookup.

mod frontmatter;
mod options;
mod resolve;


pub use frontmatter::{DocumentDefaults, read_frontmatter};
pub use options::{BlockOption, HeaderOptions, OptionValue};
pub use resolve::BlockConfig;
