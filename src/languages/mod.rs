//! Supported languages and how to run them.
//!
//! Each canonical language maps to a [`LanguageSpec`]: a plain record saying
//! which interpreter to call, whether the block is fed on stdin or through a
//! temporary file, and how its output becomes a result artifact.

mod template;


pub use template::{TemplateError, render_command};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Prefix that turns a psql query into a JSON query plan.
pub const EXPLAIN_PREFIX: &str = "EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON) ";

/// How the output of a language is rendered into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Output goes into a fenced RESULT block.
    PlainText,
    /// The interpreter echoes results back into the source as comments.
    InlineAnnotated,
    /// Output is an image file referenced by a bare Markdown image line.
    Image,
    /// Query output that can also be visualized as a plan link or flamegraph.
    StructuredPlan,
}

/// How failures are reported by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStyle {
    /// Prefix output with `Execution failed (status: N).`.
    Generic,
    /// Append `Stderr:` and the trimmed stderr to stdout.
    StderrAppended,
}

/// What the temporary file handed to the interpreter contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempFile {
    /// No temporary file; the block goes to stdin.
    None,
    /// The block content, saved with this suffix.
    Script(&'static str),
    /// An empty scratch file with this suffix; the block goes to stdin.
    Scratch(&'static str),
}

/// Options that change how a block is invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvocationOptions {
    pub explain: bool,
    pub flamegraph: bool,
}

/// Capability record for one canonical language.
#[derive(Debug)]
pub struct LanguageSpec {
    /// Canonical name, used for temp file prefixes and logs.
    pub name: &'static str,
    /// Every fence tag accepted for this language.
    pub tags: &'static [&'static str],
    /// Candidate command templates, tried in order.
    pub commands: &'static [&'static str],
    pub temp_file: TempFile,
    /// Suffix of a file the interpreter writes next to the temp file.
    pub output_suffix: Option<&'static str>,
    pub result_kind: ResultKind,
    pub error_style: ErrorStyle,
    /// Fall back to a running Postgres container when no command spawns.
    pub container_fallback: bool,
}

/// A ready-to-spawn interpreter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Candidate argument vectors; the first one that spawns is used.
    pub candidates: Vec<Vec<String>>,
    pub stdin: Option<String>,
    /// File the interpreter is expected to produce.
    pub output_path: Option<PathBuf>,
}

static LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        name: "psql",
        tags: &["psql"],
        commands: &["psql -A -t -X"],
        temp_file: TempFile::None,
        output_suffix: None,
        result_kind: ResultKind::StructuredPlan,
        error_style: ErrorStyle::Generic,
        container_fallback: true,
    },
    LanguageSpec {
        name: "ruby",
        tags: &["ruby"],
        commands: &["xmpfilter {file}"],
        temp_file: TempFile::Script(".rb"),
        output_suffix: None,
        result_kind: ResultKind::InlineAnnotated,
        error_style: ErrorStyle::Generic,
        container_fallback: false,
    },
    LanguageSpec {
        name: "js",
        tags: &["js", "javascript"],
        commands: &["bun {file}", "node {file}"],
        temp_file: TempFile::Script(".js"),
        output_suffix: None,
        result_kind: ResultKind::PlainText,
        error_style: ErrorStyle::StderrAppended,
        container_fallback: false,
    },
    LanguageSpec {
        name: "sqlite",
        tags: &["sql", "sqlite", "sqlite3"],
        commands: &["sqlite3 {file}"],
        temp_file: TempFile::Scratch(".db"),
        output_suffix: None,
        result_kind: ResultKind::PlainText,
        error_style: ErrorStyle::Generic,
        container_fallback: false,
    },
    LanguageSpec {
        name: "bash",
        tags: &["bash"],
        commands: &["bash {file}"],
        temp_file: TempFile::Script(".sh"),
        output_suffix: None,
        result_kind: ResultKind::PlainText,
        error_style: ErrorStyle::Generic,
        container_fallback: false,
    },
    LanguageSpec {
        name: "zsh",
        tags: &["zsh"],
        commands: &["zsh {file}"],
        temp_file: TempFile::Script(".zsh"),
        output_suffix: None,
        result_kind: ResultKind::PlainText,
        error_style: ErrorStyle::Generic,
        container_fallback: false,
    },
    LanguageSpec {
        name: "sh",
        tags: &["sh"],
        commands: &["sh {file}"],
        temp_file: TempFile::Script(".sh"),
        output_suffix: None,
        result_kind: ResultKind::PlainText,
        error_style: ErrorStyle::Generic,
        container_fallback: false,
    },
    LanguageSpec {
        name: "mermaid",
        tags: &["mermaid"],
        commands: &["mmdc -i {file} -o {output}"],
        temp_file: TempFile::Script(".mmd"),
        output_suffix: Some(".svg"),
        result_kind: ResultKind::Image,
        error_style: ErrorStyle::Generic,
        container_fallback: false,
    },
];

/// Find the capability record for a canonical (de-aliased) fence tag.
pub fn lookup(tag: &str) -> Option<&'static LanguageSpec> {
    LANGUAGES
        .iter()
        .find(|spec| spec.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
}


impl LanguageSpec {
    /// Build the interpreter call for `content`.
    ///
    /// `temp_path` must be given when [`Self::temp_file`] is not
    /// [`TempFile::None`]; the caller owns creating and removing it.
    pub fn invocation(
        &self,
        content: &str,
        temp_path: Option<&Path>,
        options: InvocationOptions,
    ) -> Result<Invocation, TemplateError> {
        let output_path = match (self.output_suffix, temp_path) {
            (Some(suffix), Some(path)) => Some(sibling_with_suffix(path, suffix)),
            _ => None,
        };

        let mut values = HashMap::new();
        if let Some(path) = temp_path {
            values.insert("file", path.display().to_string());
        }
        if let Some(path) = &output_path {
            values.insert("output", path.display().to_string());
        }

        let candidates = self
            .commands
            .iter()
            .map(|template| {
                let command = render_command(template, &values)?;
                shell_words::split(&command).map_err(|e| TemplateError::Unsplittable {
                    command: command.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;

        Ok(Invocation {
            candidates,
            stdin: self.stdin_for(content, options),
            output_path,
        })
    }

    /// What is written to the interpreter's stdin, if anything.
    pub fn stdin_for(&self, content: &str, options: InvocationOptions) -> Option<String> {
        match self.temp_file {
            TempFile::Script(_) => None,
            TempFile::Scratch(_) => Some(content.to_string()),
            TempFile::None if self.wants_plan(options) => {
                Some(format!("{}{}", EXPLAIN_PREFIX, content))
            }
            TempFile::None => Some(content.to_string()),
        }
    }

    /// Whether the output should be a JSON query plan.
    pub fn wants_plan(&self, options: InvocationOptions) -> bool {
        self.result_kind == ResultKind::StructuredPlan && (options.explain || options.flamegraph)
    }
}

/// `dir/name.ext` → `dir/name<suffix>`.
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, suffix))
}
