//! Result annotations that an interpreter writes into the source itself.
//!
//! `xmpfilter` appends `# >> output` lines for stdout, `# ~> message` lines
//! for exceptions, and fills `expr # =>` markers with the value.

use regex::Regex;
use std::sync::LazyLock;

/// A `# =>` marker that already carries a value.
static FILLED_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*=>\s*\S").expect("Invalid annotation marker regex"));

const OUTPUT_PREFIX: &str = "# >>";
const EXCEPTION_PREFIX: &str = "# ~>";

fn is_output_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with(OUTPUT_PREFIX) || trimmed.starts_with(EXCEPTION_PREFIX)
}

/// Whether the block content already carries results from a previous run.
pub fn has_annotations(content: &str) -> bool {
    content
        .lines()
        .any(|line| is_output_line(line) || FILLED_MARKER_REGEX.is_match(line))
}

/// Remove `# >>` / `# ~>` lines. Filled `# =>` markers are left for the
/// interpreter to refresh.
pub fn strip_annotations(content: &str) -> String {
    content
        .split_inclusive('\n')
        .filter(|line| !is_output_line(line))
        .collect()
}

/// Render diagnostic text as exception annotation lines.
pub fn as_exception_lines(text: &str) -> String {
    text.lines()
        .map(|line| format!("{} {}\n", EXCEPTION_PREFIX, line))
        .collect()
}
