//! Rendering execution outcomes into document text.
//!
//! Every trailing artifact is returned as a finished string ending in a
//! blank line, in the order the block owns them: result block, plan link,
//! flamegraph, then a failure report when the result block is hidden.

#[cfg(test)]
mod tests;

use crate::config::BlockConfig;
use crate::document::annotation::as_exception_lines;
use crate::document::artifact::{ArtifactPlan, FLAMEGRAPH_LABEL, PLAN_LINK_LABEL};
use crate::exec::ExecutionOutcome;
use crate::fs::atomic_write_file;
use crate::languages::{ErrorStyle, LanguageSpec, ResultKind};
use crate::visualize::{PlanSubmitter, render_svg};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info, warn};

const RESULT_OPEN: &str = "```RESULT\n";
const FENCE_CLOSE: &str = "```\n";

/// New text for one executed block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplicedResult {
    /// Replacement body for languages that annotate their own source.
    pub annotated_body: Option<String>,
    /// Trailing artifacts, in emission order.
    pub artifacts: Vec<String>,
}

/// Turns execution outcomes into artifacts.
pub struct ResultSplicer {
    submitter: Box<dyn PlanSubmitter>,
}

impl ResultSplicer {
    pub fn new(submitter: Box<dyn PlanSubmitter>) -> Self {
        Self { submitter }
    }

    /// Render the outcome of running `content` as a `spec` block.
    ///
    /// Generated files (flamegraphs) are written to `work_dir`. A block
    /// with a hidden result renders nothing and keeps its source.
    pub fn render(
        &self,
        config: &BlockConfig,
        spec: &LanguageSpec,
        outcome: &ExecutionOutcome,
        content: &str,
        work_dir: &Path,
    ) -> SplicedResult {
        if ArtifactPlan::for_block(config, spec.result_kind).hidden {
            if !outcome.is_success() {
                warn!(
                    language = spec.name,
                    status = %outcome.status_label(),
                    "block with result=false failed"
                );
            }
            return SplicedResult::default();
        }

        match spec.result_kind {
            ResultKind::PlainText => SplicedResult {
                annotated_body: None,
                artifacts: vec![result_fence(&frame_output(spec.error_style, outcome))],
            },
            ResultKind::InlineAnnotated => SplicedResult {
                annotated_body: Some(annotated_body(outcome, content)),
                artifacts: Vec::new(),
            },
            ResultKind::Image => SplicedResult {
                annotated_body: None,
                artifacts: vec![image_artifact(spec.error_style, outcome)],
            },
            ResultKind::StructuredPlan => SplicedResult {
                annotated_body: None,
                artifacts: self.plan_artifacts(config, spec, outcome, work_dir),
            },
        }
    }

    fn plan_artifacts(
        &self,
        config: &BlockConfig,
        spec: &LanguageSpec,
        outcome: &ExecutionOutcome,
        work_dir: &Path,
    ) -> Vec<String> {
        let visualize = config.explain || config.flamegraph;
        let shown = config.show_result;
        let framed = frame_output(spec.error_style, outcome);

        let mut artifacts = Vec::new();
        if shown {
            artifacts.push(result_fence(&framed));
        }

        if !outcome.is_success() {
            if !shown {
                artifacts.push(result_fence(&framed));
            }
            return artifacts;
        }

        if visualize {
            artifacts.extend(self.visualizations(config, outcome.stdout.trim(), work_dir));
        }
        artifacts
    }

    fn visualizations(&self, config: &BlockConfig, plan_json: &str, work_dir: &Path) -> Vec<String> {
        if let Err(e) = serde_json::from_str::<serde_json::Value>(plan_json) {
            warn!(error = %e, "query output is not a JSON plan, skipping visualization");
            return Vec::new();
        }

        let mut artifacts = Vec::new();
        if config.explain {
            match self.submitter.submit(plan_json) {
                Some(url) => artifacts.push(format!("{} [View Query Plan]({})\n\n", PLAN_LINK_LABEL, url)),
                None => debug!("no plan link produced"),
            }
        }
        if config.flamegraph
            && let Some(file_name) = write_flamegraph(plan_json, work_dir)
        {
            artifacts.push(format!("{}({})\n\n", FLAMEGRAPH_LABEL, file_name));
        }
        artifacts
    }
}

/// Output as shown in a result block, with failures framed.
///
/// A failed run is prefixed with its exit status and stderr, unless the
/// output already reads as an error report.
pub fn frame_output(style: ErrorStyle, outcome: &ExecutionOutcome) -> String {
    if outcome.is_success() {
        return outcome.stdout.clone();
    }

    let stderr = outcome.stderr.trim();
    let mut output = outcome.stdout.clone();
    if style == ErrorStyle::StderrAppended && !stderr.is_empty() {
        output.push_str("\nStderr:\n");
        output.push_str(stderr);
    }

    let already_framed = output.to_lowercase().contains("error:")
        || (style == ErrorStyle::StderrAppended && output.contains("Stderr:"));
    if already_framed {
        output
    } else {
        format!("{}\n{}", failure_summary(outcome), output)
    }
}

/// One-line failure description.
pub fn failure_summary(outcome: &ExecutionOutcome) -> String {
    let stderr = outcome.stderr.trim();
    let mut summary = format!("Execution failed (status: {}).", outcome.status_label());
    if !stderr.is_empty() {
        summary.push_str(" Stderr: ");
        summary.push_str(stderr);
    }
    summary
}

/// A RESULT block holding `text`, followed by a blank line.
pub fn result_fence(text: &str) -> String {
    let mut fence = String::with_capacity(text.len() + 16);
    fence.push_str(RESULT_OPEN);
    fence.push_str(text);
    if !text.ends_with('\n') {
        fence.push('\n');
    }
    fence.push_str(FENCE_CLOSE);
    fence.push('\n');
    fence
}

fn annotated_body(outcome: &ExecutionOutcome, content: &str) -> String {
    let mut body = if outcome.stdout.trim().is_empty() {
        content.to_string()
    } else {
        outcome.stdout.clone()
    };
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    if !outcome.is_success() {
        body.push_str(&as_exception_lines(&failure_summary(outcome)));
    }
    body
}

fn image_artifact(style: ErrorStyle, outcome: &ExecutionOutcome) -> String {
    let file_name = outcome
        .artifact_path
        .as_deref()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned());

    match file_name {
        Some(name) if outcome.is_success() => format!("![Mermaid Diagram]({})\n\n", name),
        _ => {
            if outcome.is_success() {
                warn!("diagram renderer succeeded but produced no image");
            }
            result_fence(&frame_output(style, outcome))
        }
    }
}

/// Render and save a flamegraph, returning its file name.
fn write_flamegraph(plan_json: &str, work_dir: &Path) -> Option<String> {
    let svg = match render_svg(plan_json) {
        Ok(svg) => svg,
        Err(e) => {
            warn!(error = %e, "cannot render flamegraph");
            return None;
        }
    };

    let file_name = format!(
        "pg-flamegraph-{}.svg",
        Utc::now().format("%Y%m%d-%H%M%S-%3f")
    );
    let path = work_dir.join(&file_name);
    match atomic_write_file(&path, &svg) {
        Ok(()) => {
            info!(path = %path.display(), "flamegraph written");
            Some(file_name)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot save flamegraph");
            None
        }
    }
}
