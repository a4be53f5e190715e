//! Effective options for a single code block.

use super::frontmatter::DocumentDefaults;
use super::options::{BlockOption, HeaderOptions, OptionValue};

/// Effective configuration of one code block, fixed when its fence opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockConfig {
    /// Canonical (de-aliased) language.
    pub language: String,
    pub run: bool,
    pub rerun: bool,
    pub explain: bool,
    pub flamegraph: bool,
    pub show_result: bool,
}

impl BlockConfig {
    /// Merge header options with document defaults for `language`.
    ///
    /// `language` must already be canonical.
    pub fn resolve(language: &str, header: &HeaderOptions, defaults: &DocumentDefaults) -> Self {
        let value = |option| resolve_option(option, language, header, defaults);

        Self {
            language: language.to_string(),
            run: value(BlockOption::Run),
            rerun: value(BlockOption::Rerun),
            explain: value(BlockOption::Explain),
            flamegraph: value(BlockOption::Flamegraph),
            show_result: value(BlockOption::Result),
        }
    }
}

fn resolve_option(
    option: BlockOption,
    language: &str,
    header: &HeaderOptions,
    defaults: &DocumentDefaults,
) -> bool {
    match header.get(option) {
        Some(OptionValue::Explicit(value)) => value,
        Some(OptionValue::Present) => true,
        None => defaults
            .default_for(option, language)
            .unwrap_or_else(|| option.builtin_default()),
    }
}
