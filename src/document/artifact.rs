//! Shapes of the trailing artifacts left behind by earlier runs.

use super::cursor::{LineCursor, is_blank_line, strip_terminator};
use super::header::{is_close_fence, is_inline_result_fence};
use crate::config::BlockConfig;
use crate::languages::ResultKind;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static RESULT_FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```RESULT$").expect("Invalid result fence regex"));

static SVG_IMAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^!\[.*\]\(.*\.svg\)$").expect("Invalid image regex"));

/// Label written in front of a plan visualization link.
pub const PLAN_LINK_LABEL: &str = "**Dalibo Visualization:**";
/// Older, shorter plan link form; still recognized.
const PLAN_LINK_LEGACY_LABEL: &str = "[Dalibo]";
/// Alt text of a query flamegraph image.
pub const FLAMEGRAPH_LABEL: &str = "![PostgreSQL Query Flamegraph]";

/// A kind of trailing artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `` ```RESULT `` ... `` ``` ``
    ResultFence,
    /// `` ```ruby RESULT `` ... `` ``` ``
    InlineResultFence,
    /// A bare `![...](....svg)` line.
    Image,
    /// A plan visualization link line.
    PlanLink,
    /// A flamegraph image line.
    Flamegraph,
}

impl ArtifactKind {
    /// Whether `line` opens an artifact of this kind.
    pub fn matches(self, line: &str) -> bool {
        let text = strip_terminator(line);
        match self {
            ArtifactKind::ResultFence => RESULT_FENCE_REGEX.is_match(text),
            ArtifactKind::InlineResultFence => is_inline_result_fence(text),
            ArtifactKind::Image => SVG_IMAGE_REGEX.is_match(text),
            ArtifactKind::PlanLink => {
                text.starts_with(PLAN_LINK_LABEL) || text.starts_with(PLAN_LINK_LEGACY_LABEL)
            }
            ArtifactKind::Flamegraph => text.starts_with(FLAMEGRAPH_LABEL),
        }
    }

    pub fn is_fenced(self) -> bool {
        matches!(
            self,
            ArtifactKind::ResultFence | ArtifactKind::InlineResultFence
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            ArtifactKind::ResultFence => "RESULT block",
            ArtifactKind::InlineResultFence => "ruby RESULT block",
            ArtifactKind::Image => "image",
            ArtifactKind::PlanLink => "plan link",
            ArtifactKind::Flamegraph => "flamegraph",
        }
    }

    /// Take the whole artifact starting at the cursor, which must be
    /// positioned on a line for which [`Self::matches`] is true.
    ///
    /// Fenced kinds run to their closing fence. Link-style kinds run over a
    /// maximal stretch of matching and blank lines.
    pub fn take_body<'a>(self, cursor: &mut LineCursor<'a>) -> ArtifactBody<'a> {
        let mut lines = Vec::new();
        let Some(first) = cursor.next() else {
            return ArtifactBody {
                lines,
                complete: false,
            };
        };
        lines.push(first);
        let mut complete = !self.is_fenced();

        match self {
            ArtifactKind::ResultFence | ArtifactKind::InlineResultFence => {
                for line in cursor.by_ref() {
                    lines.push(line);
                    if is_close_fence(line) {
                        complete = true;
                        break;
                    }
                }
                if !complete {
                    warn!(
                        artifact = self.describe(),
                        "end of file reached while reading existing result"
                    );
                }
            }
            ArtifactKind::Image => {}
            ArtifactKind::PlanLink | ArtifactKind::Flamegraph => {
                while let Some(line) = cursor.next_if(|l| is_blank_line(l) || self.matches(l)) {
                    lines.push(line);
                }
            }
        }

        ArtifactBody { lines, complete }
    }
}

/// Lines of an existing artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBody<'a> {
    pub lines: Vec<&'a str>,
    /// False when the stream ended before a fenced artifact was closed.
    pub complete: bool,
}

/// Which artifacts a block owns, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPlan {
    /// The artifact whose presence decides whether the block runs.
    pub primary: ArtifactKind,
    /// Artifacts that may trail the primary one. When the primary artifact
    /// is not a RESULT block, a RESULT block holding a failure report is
    /// one of them.
    pub secondaries: Vec<ArtifactKind>,
    /// Results are written back into the block itself.
    pub inline: bool,
    /// The primary artifact is refreshed on every pass.
    pub auto_replace: bool,
    /// `result=false` with nothing else to show: the block runs but
    /// writes nothing.
    pub hidden: bool,
}

impl ArtifactPlan {
    pub fn for_block(config: &BlockConfig, kind: ResultKind) -> Self {
        let visualized = kind == ResultKind::StructuredPlan && (config.explain || config.flamegraph);
        if !config.show_result && !visualized {
            let primary = match kind {
                ResultKind::Image => ArtifactKind::Image,
                ResultKind::InlineAnnotated => ArtifactKind::InlineResultFence,
                ResultKind::PlainText | ResultKind::StructuredPlan => ArtifactKind::ResultFence,
            };
            return Self {
                inline: kind == ResultKind::InlineAnnotated,
                hidden: true,
                ..Self::single(primary)
            };
        }

        match kind {
            ResultKind::PlainText => Self::single(ArtifactKind::ResultFence),
            ResultKind::Image => Self {
                secondaries: vec![ArtifactKind::ResultFence],
                ..Self::single(ArtifactKind::Image)
            },
            ResultKind::InlineAnnotated => Self {
                inline: true,
                ..Self::single(ArtifactKind::InlineResultFence)
            },
            ResultKind::StructuredPlan => Self::structured_plan(config),
        }
    }

    fn single(primary: ArtifactKind) -> Self {
        Self {
            primary,
            secondaries: Vec::new(),
            inline: false,
            auto_replace: false,
            hidden: false,
        }
    }

    fn structured_plan(config: &BlockConfig) -> Self {
        let mut kinds = Vec::new();
        if config.show_result {
            kinds.push(ArtifactKind::ResultFence);
        }
        if config.explain {
            kinds.push(ArtifactKind::PlanLink);
        }
        if config.flamegraph {
            kinds.push(ArtifactKind::Flamegraph);
        }

        let primary = kinds.remove(0);
        if primary != ArtifactKind::ResultFence {
            // Slot for a failure report when the result itself is hidden.
            kinds.push(ArtifactKind::ResultFence);
        }
        Self {
            primary,
            secondaries: kinds,
            inline: false,
            auto_replace: !config.show_result,
            hidden: false,
        }
    }

    /// Every kind this block may own, primary first.
    #[cfg(test)]
    fn kinds(&self) -> impl Iterator<Item = ArtifactKind> + '_ {
        std::iter::once(self.primary).chain(self.secondaries.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DocumentDefaults, HeaderOptions};

    fn config(language: &str, header: &str) -> BlockConfig {
        BlockConfig::resolve(
            language,
            &HeaderOptions::parse(header),
            &DocumentDefaults::default(),
        )
    }

    #[test]
    fn test_result_fence_matching() {
        assert!(ArtifactKind::ResultFence.matches("```RESULT\n"));
        assert!(ArtifactKind::ResultFence.matches("```result\n"));
        assert!(!ArtifactKind::ResultFence.matches("```RESULT extra\n"));
        assert!(!ArtifactKind::ResultFence.matches("```ruby RESULT\n"));
        assert!(ArtifactKind::InlineResultFence.matches("```ruby RESULT\n"));
    }

    #[test]
    fn test_image_matching() {
        assert!(ArtifactKind::Image.matches("![Mermaid Diagram](mermaid1.svg)\n"));
        assert!(!ArtifactKind::Image.matches("![Photo](photo.png)\n"));
        assert!(!ArtifactKind::Image.matches("See ![x](x.svg)\n"));
    }

    #[test]
    fn test_link_matching() {
        assert!(ArtifactKind::PlanLink.matches(
            "**Dalibo Visualization:** [View Query Plan](https://explain.dalibo.com/plan/1)\n"
        ));
        assert!(ArtifactKind::PlanLink.matches("[Dalibo](https://explain.dalibo.com/plan/1)\n"));
        assert!(!ArtifactKind::PlanLink.matches("Dalibo is nice\n"));
        assert!(
            ArtifactKind::Flamegraph
                .matches("![PostgreSQL Query Flamegraph](pg-flamegraph-1.svg)\n")
        );
    }

    #[test]
    fn test_take_fenced_body() {
        let mut cursor = LineCursor::new("```RESULT\nx\n```\nafter\n");
        let body = ArtifactKind::ResultFence.take_body(&mut cursor);

        assert!(body.complete);
        assert_eq!(body.lines, vec!["```RESULT\n", "x\n", "```\n"]);
        assert_eq!(cursor.next(), Some("after\n"));
    }

    #[test]
    fn test_take_fenced_body_unterminated() {
        let mut cursor = LineCursor::new("```RESULT\nx\ny\n");
        let body = ArtifactKind::ResultFence.take_body(&mut cursor);

        assert!(!body.complete);
        assert_eq!(body.lines, vec!["```RESULT\n", "x\n", "y\n"]);
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_take_image_is_single_line() {
        let mut cursor = LineCursor::new("![Mermaid Diagram](a.svg)\n\ntext\n");
        let body = ArtifactKind::Image.take_body(&mut cursor);

        assert!(body.complete);
        assert_eq!(body.lines, vec!["![Mermaid Diagram](a.svg)\n"]);
        assert_eq!(cursor.next(), Some("\n"));
    }

    #[test]
    fn test_take_link_run() {
        let input = "[Dalibo](u1)\n\n**Dalibo Visualization:** [View Query Plan](u2)\n\ntext\n";
        let mut cursor = LineCursor::new(input);
        let body = ArtifactKind::PlanLink.take_body(&mut cursor);

        assert_eq!(body.lines.len(), 4);
        assert_eq!(cursor.next(), Some("text\n"));
    }

    #[test]
    fn test_plan_for_plain_text() {
        let plan = ArtifactPlan::for_block(&config("bash", ""), ResultKind::PlainText);
        assert_eq!(plan.primary, ArtifactKind::ResultFence);
        assert!(plan.secondaries.is_empty());
        assert!(!plan.inline);
        assert!(!plan.auto_replace);
    }

    #[test]
    fn test_plan_for_inline() {
        let plan = ArtifactPlan::for_block(&config("ruby", ""), ResultKind::InlineAnnotated);
        assert_eq!(plan.primary, ArtifactKind::InlineResultFence);
        assert!(plan.inline);
    }

    #[test]
    fn test_plan_for_structured_plan_with_result() {
        let plan = ArtifactPlan::for_block(
            &config("psql", "explain flamegraph"),
            ResultKind::StructuredPlan,
        );
        assert_eq!(plan.primary, ArtifactKind::ResultFence);
        assert_eq!(
            plan.secondaries,
            vec![ArtifactKind::PlanLink, ArtifactKind::Flamegraph]
        );
        assert!(!plan.auto_replace);
    }

    #[test]
    fn test_plan_for_link_only() {
        let plan = ArtifactPlan::for_block(
            &config("psql", "explain result=false"),
            ResultKind::StructuredPlan,
        );
        assert_eq!(plan.primary, ArtifactKind::PlanLink);
        assert_eq!(plan.secondaries, vec![ArtifactKind::ResultFence]);
        assert!(plan.auto_replace);

        let plan = ArtifactPlan::for_block(
            &config("psql", "flamegraph result=false"),
            ResultKind::StructuredPlan,
        );
        assert_eq!(plan.primary, ArtifactKind::Flamegraph);
        assert!(plan.auto_replace);
    }

    #[test]
    fn test_plan_for_hidden_result_without_visualization() {
        let plan = ArtifactPlan::for_block(&config("psql", "result=false"), ResultKind::StructuredPlan);
        assert_eq!(plan.primary, ArtifactKind::ResultFence);
        assert!(plan.secondaries.is_empty());
        assert!(plan.hidden);
        assert!(!plan.auto_replace);

        let plan = ArtifactPlan::for_block(&config("bash", "result=false"), ResultKind::PlainText);
        assert!(plan.hidden);

        let plan = ArtifactPlan::for_block(&config("mermaid", "result=false"), ResultKind::Image);
        assert_eq!(plan.primary, ArtifactKind::Image);
        assert!(plan.secondaries.is_empty());
        assert!(plan.hidden);

        let plan = ArtifactPlan::for_block(&config("ruby", "result=false"), ResultKind::InlineAnnotated);
        assert!(plan.inline);
        assert!(plan.hidden);
    }

    #[test]
    fn test_visualization_is_not_hidden() {
        let plan = ArtifactPlan::for_block(
            &config("psql", "explain result=false"),
            ResultKind::StructuredPlan,
        );
        assert!(!plan.hidden);

        // explain means nothing outside psql
        let plan = ArtifactPlan::for_block(&config("bash", "explain result=false"), ResultKind::PlainText);
        assert!(plan.hidden);
    }

    #[test]
    fn test_plan_kinds_order() {
        let plan = ArtifactPlan::for_block(
            &config("psql", "explain flamegraph result=false"),
            ResultKind::StructuredPlan,
        );
        let kinds: Vec<_> = plan.kinds().collect();
        assert_eq!(
            kinds,
            vec![
                ArtifactKind::PlanLink,
                ArtifactKind::Flamegraph,
                ArtifactKind::ResultFence
            ]
        );
    }

    #[test]
    fn test_plan_for_image() {
        let plan = ArtifactPlan::for_block(&config("mermaid", ""), ResultKind::Image);
        assert_eq!(plan.primary, ArtifactKind::Image);
        assert_eq!(plan.secondaries, vec![ArtifactKind::ResultFence]);
        assert!(!plan.auto_replace);
    }
}
