//! The line-by-line pass over a whole document.

use super::annotation::strip_annotations;
use super::artifact::ArtifactPlan;
use super::cursor::LineCursor;
use super::decision::{ExecutionDecision, decide};
use super::header::{FenceHeader, is_close_fence, is_inline_result_fence};
use crate::config::{BlockConfig, DocumentDefaults, read_frontmatter};
use crate::error::Result;
use crate::exec::{ExecutionRequest, ExecutionService};
use crate::languages::{self, InvocationOptions, LanguageSpec};
use crate::splice::ResultSplicer;
use std::path::Path;
use tracing::{debug, info, warn};

/// A code block whose closing fence has not been seen yet.
struct OpenBlock<'i> {
    spec: &'static LanguageSpec,
    config: BlockConfig,
    /// Line number of the opening fence.
    opened_at: usize,
    lines: Vec<&'i str>,
}

enum ScanState<'i> {
    Outside,
    InsideCode(OpenBlock<'i>),
    /// Inside a ruby RESULT fence that no block owns; copied as-is.
    InsidePassthroughResult,
}

#[derive(Debug, Default)]
struct PassStats {
    executed: usize,
    skipped: usize,
}

/// Runs the code blocks of a document and splices their results in.
pub struct DocumentProcessor<'a> {
    executor: &'a mut dyn ExecutionService,
    splicer: ResultSplicer,
    work_dir: &'a Path,
}

impl<'a> DocumentProcessor<'a> {
    /// `work_dir` is where interpreters run and generated files are saved,
    /// normally the document's own directory.
    pub fn new(
        executor: &'a mut dyn ExecutionService,
        splicer: ResultSplicer,
        work_dir: &'a Path,
    ) -> Self {
        Self {
            executor,
            splicer,
            work_dir,
        }
    }

    /// Process a whole document and return its new text.
    ///
    /// Block failures end up in the document. Only errors that make the
    /// whole pass pointless, such as a missing interpreter, are returned.
    pub fn process(&mut self, input: &str) -> Result<String> {
        let mut cursor = LineCursor::new(input);
        let mut output = String::with_capacity(input.len());
        let defaults = read_frontmatter(&mut cursor, &mut output);
        let mut stats = PassStats::default();
        let mut state = ScanState::Outside;

        while let Some(line) = cursor.next() {
            state = match state {
                ScanState::Outside => open(line, cursor.line_number(), &defaults, &mut output),
                ScanState::InsideCode(mut block) => {
                    if is_close_fence(line) {
                        if self.close(block, line, &mut cursor, &mut output)? {
                            stats.executed += 1;
                        } else {
                            stats.skipped += 1;
                        }
                        ScanState::Outside
                    } else {
                        block.lines.push(line);
                        ScanState::InsideCode(block)
                    }
                }
                ScanState::InsidePassthroughResult => {
                    output.push_str(line);
                    if is_close_fence(line) {
                        ScanState::Outside
                    } else {
                        ScanState::InsidePassthroughResult
                    }
                }
            };
        }

        match state {
            ScanState::InsideCode(block) => {
                warn!(
                    language = block.spec.name,
                    line = block.opened_at,
                    "code block is never closed, leaving it as is"
                );
                output.extend(block.lines);
            }
            ScanState::InsidePassthroughResult => {
                debug!("ruby RESULT block runs to end of file");
            }
            ScanState::Outside => {}
        }

        info!(
            executed = stats.executed,
            skipped = stats.skipped,
            "document processed"
        );
        Ok(output)
    }

    /// Decide the fate of `block` and write it out. Returns whether it ran.
    fn close<'i>(
        &mut self,
        block: OpenBlock<'i>,
        close_line: &'i str,
        cursor: &mut LineCursor<'i>,
        output: &mut String,
    ) -> Result<bool> {
        let content = block.lines.concat();
        let plan = ArtifactPlan::for_block(&block.config, block.spec.result_kind);
        let decision = decide(&block.config, &plan, &content, cursor);

        debug!(
            language = block.spec.name,
            line = block.opened_at,
            execute = decision.execute,
            reason = decision.reason.describe(),
            artifact = decision.artifact_kind.describe(),
            "code block closed"
        );

        if !decision.execute {
            output.push_str(&content);
            output.push_str(close_line);
            output.extend(decision.pass_through_lines);
            return Ok(false);
        }

        let source = if plan.inline {
            strip_annotations(&content)
        } else {
            content.clone()
        };
        let request = ExecutionRequest {
            language: block.spec.name,
            content: &source,
            work_dir: self.work_dir,
            options: InvocationOptions {
                explain: block.config.explain,
                flamegraph: block.config.flamegraph,
            },
        };
        let outcome = self.executor.execute(&request)?;
        let spliced = self
            .splicer
            .render(&block.config, block.spec, &outcome, &source, self.work_dir);

        output.push_str(spliced.annotated_body.as_deref().unwrap_or(&content));
        output.push_str(close_line);
        emit_artifacts(&decision, &spliced.artifacts, close_line, output);
        Ok(true)
    }
}

/// Handle a line outside any block.
fn open<'i>(
    line: &'i str,
    line_number: usize,
    defaults: &DocumentDefaults,
    output: &mut String,
) -> ScanState<'i> {
    output.push_str(line);

    if is_inline_result_fence(line) {
        debug!(line = line_number, "copying unowned ruby RESULT block");
        return ScanState::InsidePassthroughResult;
    }

    let Some(header) = FenceHeader::parse(line) else {
        return ScanState::Outside;
    };
    let language = defaults.resolve_language(&header.tag);
    let Some(spec) = languages::lookup(language) else {
        debug!(tag = %header.tag, line = line_number, "unsupported language, block left as is");
        return ScanState::Outside;
    };

    ScanState::InsideCode(OpenBlock {
        spec,
        config: BlockConfig::resolve(language, &header.options(), defaults),
        opened_at: line_number,
        lines: Vec::new(),
    })
}

/// Write new artifacts after the closing fence, separated from it by
/// exactly one blank line, then whatever the decision left standing.
fn emit_artifacts(
    decision: &ExecutionDecision<'_>,
    artifacts: &[String],
    close_line: &str,
    output: &mut String,
) {
    if artifacts.is_empty() {
        if let Some(separator) = decision.blank_separator {
            output.push_str(separator);
        }
    } else {
        if !close_line.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(decision.blank_separator.unwrap_or("\n"));
        for artifact in artifacts {
            output.push_str(artifact);
        }
    }
    output.extend(decision.pass_through_lines.iter().copied());
}
