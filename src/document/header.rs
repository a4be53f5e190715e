//! Fence line classification.

use super::cursor::strip_terminator;
use crate::config::HeaderOptions;
use regex::Regex;
use std::sync::LazyLock;

/// Opening fence: three backticks, a language tag, then optional options.
static FENCE_OPEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(\w+)(?:\s+(.*))?$").expect("Invalid fence regex"));

/// An inline result fence (`` ```ruby RESULT ``).
static INLINE_RESULT_FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^```ruby\s+RESULT$").expect("Invalid inline result fence regex")
});

pub const FENCE_MARKER: &str = "```";

/// A parsed fence-open line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceHeader<'a> {
    /// Language tag as written, lowercased. Not yet de-aliased.
    pub tag: String,
    /// Raw text after the tag.
    pub raw_options: &'a str,
}

impl<'a> FenceHeader<'a> {
    /// Parse a fence-open line. Returns `None` for anything else, including
    /// a bare closing fence.
    pub fn parse(line: &'a str) -> Option<Self> {
        let caps = FENCE_OPEN_REGEX.captures(strip_terminator(line))?;
        let tag = caps.get(1)?.as_str().to_lowercase();
        let raw_options = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        Some(Self { tag, raw_options })
    }

    pub fn options(&self) -> HeaderOptions {
        HeaderOptions::parse(self.raw_options)
    }
}

/// A bare fence marker, surrounding whitespace allowed.
pub fn is_close_fence(line: &str) -> bool {
    line.trim() == FENCE_MARKER
}

pub fn is_inline_result_fence(line: &str) -> bool {
    INLINE_RESULT_FENCE_REGEX.is_match(strip_terminator(line))
}
