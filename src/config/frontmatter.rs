//! Document-level defaults read from YAML frontmatter.
//!
//! # Frontmatter Format
//!
//! ```text
//! ---
//! markdown-run:
//!   alias:
//!     - sql: psql
//!   defaults:
//!     rerun: true
//!   psql:
//!     explain: true
//! ---
//! ```
//!
//! Every other top-level key belongs to the document and is ignored.

use super::options::BlockOption;
use crate::document::LineCursor;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const FRONTMATTER_DELIMITER: &str = "---";

type OptionLayer = BTreeMap<BlockOption, bool>;

/// Aliases and option defaults for a whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentDefaults {
    aliases: BTreeMap<String, String>,
    global: OptionLayer,
    per_language: BTreeMap<String, OptionLayer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontmatterDocument {
    #[serde(rename = "markdown-run")]
    markdown_run: Option<RunSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RunSection {
    alias: Vec<BTreeMap<String, String>>,
    defaults: BTreeMap<String, bool>,
    /// Per-language maps; anything that is not a mapping is skipped.
    #[serde(flatten)]
    languages: BTreeMap<String, serde_yaml::Value>,
}

impl DocumentDefaults {
    /// Parse the YAML between the frontmatter delimiters.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let document: FrontmatterDocument = serde_yaml::from_str(yaml)?;
        Ok(document
            .markdown_run
            .map(Self::from_section)
            .unwrap_or_default())
    }

    /// Like [`Self::from_yaml`], but malformed YAML falls back to built-in
    /// defaults with a warning instead of failing the run.
    pub fn from_yaml_lenient(yaml: &str) -> Self {
        Self::from_yaml(yaml).unwrap_or_else(|e| {
            warn!(error = %e, "invalid YAML frontmatter, using built-in defaults");
            Self::default()
        })
    }

    fn from_section(section: RunSection) -> Self {
        let mut aliases = BTreeMap::new();
        for entry in section.alias {
            for (name, target) in entry {
                aliases.insert(name.to_lowercase(), target.to_lowercase());
            }
        }

        let global = option_layer(section.defaults.into_iter());

        let mut per_language = BTreeMap::new();
        for (language, value) in section.languages {
            let serde_yaml::Value::Mapping(map) = value else {
                debug!(key = %language, "skipping non-mapping frontmatter entry");
                continue;
            };
            let entries = map.into_iter().filter_map(|(key, value)| {
                Some((key.as_str()?.to_string(), value.as_bool()?))
            });
            per_language.insert(language.to_lowercase(), option_layer(entries));
        }

        Self {
            aliases,
            global,
            per_language,
        }
    }

    /// Map a fence tag to its canonical language name.
    pub fn resolve_language<'a>(&'a self, tag: &'a str) -> &'a str {
        self.aliases.get(tag).map(String::as_str).unwrap_or(tag)
    }

    /// Default from the frontmatter: language layer first, then global.
    pub fn default_for(&self, option: BlockOption, language: &str) -> Option<bool> {
        self.per_language
            .get(language)
            .and_then(|layer| layer.get(&option))
            .or_else(|| self.global.get(&option))
            .copied()
    }
}

fn option_layer(entries: impl Iterator<Item = (String, bool)>) -> OptionLayer {
    entries
        .filter_map(|(key, value)| match BlockOption::from_key(&key) {
            Some(option) => Some((option, value)),
            None => {
                debug!(key = %key, "ignoring unknown option in frontmatter");
                None
            }
        })
        .collect()
}

/// Copy a leading frontmatter section to `output` and parse it.
///
/// Does nothing unless the very first line is `---`. Every frontmatter line,
/// both delimiters included, is written to `output` unchanged. A missing
/// closing delimiter consumes the rest of the stream.
pub fn read_frontmatter(cursor: &mut LineCursor<'_>, output: &mut String) -> DocumentDefaults {
    if cursor.peek().map(str::trim) != Some(FRONTMATTER_DELIMITER) {
        return DocumentDefaults::default();
    }

    if let Some(opening) = cursor.next() {
        output.push_str(opening);
    }

    let mut yaml = String::new();
    let mut closed = false;
    for line in cursor.by_ref() {
        output.push_str(line);
        if line.trim() == FRONTMATTER_DELIMITER {
            closed = true;
            break;
        }
        yaml.push_str(line);
    }

    if !closed {
        warn!("frontmatter has no closing '---', using built-in defaults");
        return DocumentDefaults::default();
    }

    DocumentDefaults::from_yaml_lenient(&yaml)
}
