//! Option names and the fence-header option tokenizer.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Matches `key`, `key=value` and `key = value` tokens.
static OPTION_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_][A-Za-z0-9_-]*)(?:\s*=\s*([^,\s]*))?").expect("Invalid option token regex")
});

/// A boolean block option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockOption {
    /// Execute the block at all.
    Run,
    /// Execute even when a result artifact already exists.
    Rerun,
    /// Produce a query-plan visualization link.
    Explain,
    /// Produce a locally rendered flamegraph image.
    Flamegraph,
    /// Show the primary result body (`showResult`).
    Result,
}

impl BlockOption {
    pub const ALL: [BlockOption; 5] = [
        BlockOption::Run,
        BlockOption::Rerun,
        BlockOption::Explain,
        BlockOption::Flamegraph,
        BlockOption::Result,
    ];

    /// The key used in fence headers and frontmatter.
    pub fn key(self) -> &'static str {
        match self {
            BlockOption::Run => "run",
            BlockOption::Rerun => "rerun",
            BlockOption::Explain => "explain",
            BlockOption::Flamegraph => "flamegraph",
            BlockOption::Result => "result",
        }
    }

    /// Parse an option key (case-insensitive).
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| option.key().eq_ignore_ascii_case(key))
    }

    /// Value used when no layer sets the option.
    pub fn builtin_default(self) -> bool {
        matches!(self, BlockOption::Run | BlockOption::Result)
    }
}

/// How an option appeared on a fence header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionValue {
    /// `key=true` / `key=false`.
    Explicit(bool),
    /// Bare `key`.
    Present,
}

/// Options written on a single fence opener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderOptions {
    values: BTreeMap<BlockOption, OptionValue>,
}

impl HeaderOptions {
    /// Tokenize the text following the language tag.
    ///
    /// An explicit `key=value` always wins over a bare `key` for the same
    /// option, whatever their order; among several explicit values the first
    /// one wins. Values other than `true`/`false` are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut values = BTreeMap::new();

        for caps in OPTION_TOKEN_REGEX.captures_iter(raw) {
            let key = &caps[1];
            let Some(option) = BlockOption::from_key(key) else {
                debug!(token = key, "ignoring unknown block option");
                continue;
            };

            match caps.get(2).map(|m| m.as_str()) {
                Some(value) => match parse_bool(value) {
                    Some(flag) => {
                        let slot = values.entry(option).or_insert(OptionValue::Explicit(flag));
                        if *slot == OptionValue::Present {
                            *slot = OptionValue::Explicit(flag);
                        }
                    }
                    None => warn!(
                        option = option.key(),
                        value, "ignoring non-boolean option value"
                    ),
                },
                None => {
                    values.entry(option).or_insert(OptionValue::Present);
                }
            }
        }

        Self { values }
    }

    pub fn get(&self, option: BlockOption) -> Option<OptionValue> {
        self.values.get(&option).copied()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
