//! Whether a closed block runs, and what happens to the lines after it.

use super::annotation::has_annotations;
use super::artifact::{ArtifactKind, ArtifactPlan};
use super::cursor::{LineCursor, is_blank_line};
use crate::config::BlockConfig;

/// Why a block was or was not executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    RunDisabled,
    EmptyContent,
    /// Results already live inside the block.
    AlreadyAnnotated,
    /// Inline results present, but `rerun` asks for fresh ones.
    Reannotate,
    /// Nothing recognizable follows the block.
    NoArtifact,
    /// A result follows the block and is kept.
    ArtifactPresent,
    Rerun,
    /// The only result is a link or image, which is always refreshed.
    AutoReplace,
}

impl DecisionReason {
    pub fn describe(self) -> &'static str {
        match self {
            DecisionReason::RunDisabled => "run=false",
            DecisionReason::EmptyContent => "empty block",
            DecisionReason::AlreadyAnnotated => "block already annotated",
            DecisionReason::Reannotate => "rerun of annotated block",
            DecisionReason::NoArtifact => "no existing result",
            DecisionReason::ArtifactPresent => "existing result kept",
            DecisionReason::Rerun => "rerun requested",
            DecisionReason::AutoReplace => "link-only result refreshed",
        }
    }
}

/// Outcome of inspecting a closed block and the lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionDecision<'a> {
    pub execute: bool,
    pub reason: DecisionReason,
    /// Kind of the artifact that decided the outcome.
    pub artifact_kind: ArtifactKind,
    /// Lines read after the closing fence that are discarded.
    pub consumed_lines: Vec<&'a str>,
    /// Lines read after the closing fence that are copied forward unchanged,
    /// after any new output.
    pub pass_through_lines: Vec<&'a str>,
    /// First blank line after the fence, replayed before new output.
    pub blank_separator: Option<&'a str>,
}

impl<'a> ExecutionDecision<'a> {
    fn untouched(execute: bool, reason: DecisionReason, artifact_kind: ArtifactKind) -> Self {
        Self {
            execute,
            reason,
            artifact_kind,
            consumed_lines: Vec::new(),
            pass_through_lines: Vec::new(),
            blank_separator: None,
        }
    }
}

/// Decide the fate of a block whose closing fence was just read.
///
/// Reads from `cursor` only as far as the block's own artifacts extend;
/// everything past them is left for the scanner.
pub fn decide<'a>(
    config: &BlockConfig,
    plan: &ArtifactPlan,
    content: &str,
    cursor: &mut LineCursor<'a>,
) -> ExecutionDecision<'a> {
    if !config.run {
        return ExecutionDecision::untouched(false, DecisionReason::RunDisabled, plan.primary);
    }
    if content.trim().is_empty() {
        return ExecutionDecision::untouched(false, DecisionReason::EmptyContent, plan.primary);
    }
    if plan.inline && has_annotations(content) {
        let reason = if config.rerun {
            DecisionReason::Reannotate
        } else {
            DecisionReason::AlreadyAnnotated
        };
        return ExecutionDecision::untouched(config.rerun, reason, plan.primary);
    }

    let blank_separator = cursor.next_if(is_blank_line);
    // Surplus blank lines, discarded either way.
    let mut surplus = Vec::new();
    while let Some(extra) = cursor.next_if(is_blank_line) {
        surplus.push(extra);
    }

    // Stale artifacts and the blank lines between them, in document order.
    let mut kept = Vec::new();
    // An artifact cut short by the end of the stream: ordinary content.
    let mut trailing = Vec::new();
    let mut stale = false;

    let mut primary_present = false;
    if cursor.peek().is_some_and(|line| plan.primary.matches(line)) {
        let body = plan.primary.take_body(cursor);
        if body.complete {
            kept.extend(body.lines);
            primary_present = true;
            stale = true;
        } else {
            trailing = body.lines;
        }
    }

    let (execute, reason) = if !primary_present {
        (true, DecisionReason::NoArtifact)
    } else if config.rerun {
        (true, DecisionReason::Rerun)
    } else if plan.auto_replace {
        (true, DecisionReason::AutoReplace)
    } else {
        (false, DecisionReason::ArtifactPresent)
    };

    for kind in &plan.secondaries {
        if !trailing.is_empty() {
            break;
        }
        while let Some(blank) = cursor.next_if(is_blank_line) {
            kept.push(blank);
        }
        if cursor.peek().is_some_and(|line| kind.matches(line)) {
            let body = kind.take_body(cursor);
            if body.complete {
                kept.extend(body.lines);
                stale = true;
            } else {
                trailing = body.lines;
            }
        }
    }

    if execute && stale && trailing.is_empty() {
        while let Some(blank) = cursor.next_if(is_blank_line) {
            kept.push(blank);
        }
    }

    let leading = blank_separator.into_iter();
    if execute {
        ExecutionDecision {
            execute,
            reason,
            artifact_kind: plan.primary,
            consumed_lines: leading.chain(surplus).chain(kept).collect(),
            pass_through_lines: trailing,
            blank_separator,
        }
    } else {
        ExecutionDecision {
            execute,
            reason,
            artifact_kind: plan.primary,
            consumed_lines: surplus,
            pass_through_lines: leading.chain(kept).chain(trailing).collect(),
            blank_separator,
        }
    }
}
