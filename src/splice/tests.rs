use super::*;
use crate::config::{DocumentDefaults, HeaderOptions};
use crate::languages::lookup;
use crate::test_support::{CannedSubmitter, SIMPLE_PLAN};
use crate::visualize::DisabledSubmitter;
use tempfile::TempDir;

fn config(language: &str, header: &str) -> BlockConfig {
    BlockConfig::resolve(
        language,
        &HeaderOptions::parse(header),
        &DocumentDefaults::default(),
    )
}

fn render(language: &str, header: &str, outcome: &ExecutionOutcome, dir: &Path) -> SplicedResult {
    let splicer = ResultSplicer::new(Box::new(CannedSubmitter::default()));
    let spec = lookup(language).unwrap();
    splicer.render(&config(language, header), spec, outcome, "code\n", dir)
}

#[test]
fn test_result_fence_layout() {
    assert_eq!(result_fence("x\n"), "```RESULT\nx\n```\n\n");
    assert_eq!(result_fence("x"), "```RESULT\nx\n```\n\n");
    assert_eq!(result_fence(""), "```RESULT\n\n```\n\n");
}

#[test]
fn test_frame_success_is_untouched() {
    let outcome = ExecutionOutcome::success("fine\n");
    assert_eq!(frame_output(ErrorStyle::Generic, &outcome), "fine\n");
}

#[test]
fn test_frame_generic_failure() {
    let outcome = ExecutionOutcome::failure(Some(2), "partial\n", "  boom\n");
    assert_eq!(
        frame_output(ErrorStyle::Generic, &outcome),
        "Execution failed (status: 2). Stderr: boom\npartial\n"
    );
}

#[test]
fn test_frame_failure_without_stderr() {
    let outcome = ExecutionOutcome::failure(None, "", "");
    assert_eq!(
        frame_output(ErrorStyle::Generic, &outcome),
        "Execution failed (status: terminated).\n"
    );
}

#[test]
fn test_frame_skips_output_that_is_already_an_error() {
    let outcome = ExecutionOutcome::failure(Some(1), "Error: near \"SELEC\": syntax error\n", "");
    assert_eq!(
        frame_output(ErrorStyle::Generic, &outcome),
        "Error: near \"SELEC\": syntax error\n"
    );

    let unsupported = ExecutionOutcome::unsupported("cobol");
    assert_eq!(
        frame_output(ErrorStyle::Generic, &unsupported),
        "ERROR: Unsupported language: cobol"
    );
}

#[test]
fn test_frame_stderr_appended_style() {
    let outcome = ExecutionOutcome::failure(Some(1), "before\n", "ReferenceError: x is not defined\n");
    assert_eq!(
        frame_output(ErrorStyle::StderrAppended, &outcome),
        "before\n\nStderr:\nReferenceError: x is not defined"
    );
}

#[test]
fn test_plain_text_renders_result_fence() {
    let dir = TempDir::new().unwrap();
    let spliced = render("bash", "", &ExecutionOutcome::success("hello\n"), dir.path());

    assert_eq!(spliced.annotated_body, None);
    assert_eq!(spliced.artifacts, vec!["```RESULT\nhello\n```\n\n".to_string()]);
}

#[test]
fn test_inline_success_replaces_body() {
    let dir = TempDir::new().unwrap();
    let outcome = ExecutionOutcome::success("puts 1\n# >> 1\n");
    let spliced = render("ruby", "", &outcome, dir.path());

    assert_eq!(spliced.annotated_body.as_deref(), Some("puts 1\n# >> 1\n"));
    assert!(spliced.artifacts.is_empty());
}

#[test]
fn test_inline_empty_output_keeps_source() {
    let dir = TempDir::new().unwrap();
    let spliced = render("ruby", "", &ExecutionOutcome::success(""), dir.path());
    assert_eq!(spliced.annotated_body.as_deref(), Some("code\n"));
}

#[test]
fn test_inline_failure_appends_exception_lines() {
    let dir = TempDir::new().unwrap();
    let outcome = ExecutionOutcome::failure(Some(1), "", "cannot load such file\n");
    let spliced = render("ruby", "", &outcome, dir.path());

    assert_eq!(
        spliced.annotated_body.as_deref(),
        Some("code\n# ~> Execution failed (status: 1). Stderr: cannot load such file\n")
    );
}

#[test]
fn test_image_success_renders_image_line() {
    let dir = TempDir::new().unwrap();
    let outcome = ExecutionOutcome {
        artifact_path: Some(dir.path().join("mermaid1a2b.svg")),
        ..ExecutionOutcome::success("")
    };
    let spliced = render("mermaid", "", &outcome, dir.path());

    assert_eq!(
        spliced.artifacts,
        vec!["![Mermaid Diagram](mermaid1a2b.svg)\n\n".to_string()]
    );
}

#[test]
fn test_image_failure_renders_result_fence() {
    let dir = TempDir::new().unwrap();
    let outcome = ExecutionOutcome::failure(Some(1), "", "Parse error on line 2\n");
    let spliced = render("mermaid", "", &outcome, dir.path());

    assert_eq!(spliced.artifacts.len(), 1);
    assert!(spliced.artifacts[0].starts_with("```RESULT\nExecution failed (status: 1)."));
}

#[test]
fn test_plan_with_result_and_link() {
    let dir = TempDir::new().unwrap();
    let spliced = render("psql", "explain", &ExecutionOutcome::success(SIMPLE_PLAN), dir.path());

    assert_eq!(spliced.artifacts.len(), 2);
    assert!(spliced.artifacts[0].starts_with("```RESULT\n[{\"Plan\""));
    assert_eq!(
        spliced.artifacts[1],
        "**Dalibo Visualization:** [View Query Plan](https://plans.test/1)\n\n"
    );
}

#[test]
fn test_plan_link_only() {
    let dir = TempDir::new().unwrap();
    let submitter = CannedSubmitter::default();
    let splicer = ResultSplicer::new(Box::new(submitter.clone()));
    let spliced = splicer.render(
        &config("psql", "explain result=false"),
        lookup("psql").unwrap(),
        &ExecutionOutcome::success(format!("{}\n", SIMPLE_PLAN)),
        "SELECT 1;\n",
        dir.path(),
    );

    assert_eq!(
        spliced.artifacts,
        vec!["**Dalibo Visualization:** [View Query Plan](https://plans.test/1)\n\n".to_string()]
    );
    assert_eq!(submitter.submitted(), vec![SIMPLE_PLAN.to_string()]);
}

#[test]
fn test_plan_link_unavailable() {
    let dir = TempDir::new().unwrap();
    let splicer = ResultSplicer::new(Box::new(DisabledSubmitter));
    let spliced = splicer.render(
        &config("psql", "explain result=false"),
        lookup("psql").unwrap(),
        &ExecutionOutcome::success(SIMPLE_PLAN),
        "SELECT 1;\n",
        dir.path(),
    );
    assert!(spliced.artifacts.is_empty());
}

#[test]
fn test_plan_flamegraph_written_beside_document() {
    let dir = TempDir::new().unwrap();
    let spliced = render(
        "psql",
        "flamegraph result=false",
        &ExecutionOutcome::success(SIMPLE_PLAN),
        dir.path(),
    );

    assert_eq!(spliced.artifacts.len(), 1);
    let line = &spliced.artifacts[0];
    assert!(line.starts_with("![PostgreSQL Query Flamegraph](pg-flamegraph-"));
    assert!(line.ends_with(".svg)\n\n"));

    let name = line
        .trim_end()
        .trim_start_matches("![PostgreSQL Query Flamegraph](")
        .trim_end_matches(')');
    let svg = std::fs::read_to_string(dir.path().join(name)).unwrap();
    assert!(svg.contains("Seq Scan (users) [45.23ms]"));
}

#[test]
fn test_plan_invalid_json_has_no_visualization() {
    let dir = TempDir::new().unwrap();
    let spliced = render(
        "psql",
        "explain flamegraph result=false",
        &ExecutionOutcome::success("not json\n"),
        dir.path(),
    );

    assert!(spliced.artifacts.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_plan_failure_with_hidden_result_reports_in_fence() {
    let dir = TempDir::new().unwrap();
    let outcome = ExecutionOutcome::failure(Some(3), "", "relation \"nope\" does not exist\n");
    let spliced = render("psql", "explain result=false", &outcome, dir.path());

    assert_eq!(
        spliced.artifacts,
        vec![
            "```RESULT\nExecution failed (status: 3). Stderr: relation \"nope\" does not exist\n```\n\n"
                .to_string()
        ]
    );
}

#[test]
fn test_hidden_result_renders_nothing() {
    let dir = TempDir::new().unwrap();
    let outcome = ExecutionOutcome::success("hidden\n");

    for language in ["bash", "js", "sqlite", "psql", "mermaid", "ruby"] {
        let spliced = render(language, "result=false", &outcome, dir.path());
        assert_eq!(spliced, SplicedResult::default(), "{}", language);
    }
}

#[test]
fn test_hidden_result_failure_renders_nothing() {
    let dir = TempDir::new().unwrap();
    let outcome = ExecutionOutcome::failure(Some(1), "", "boom\n");
    let spliced = render("bash", "result=false", &outcome, dir.path());
    assert!(spliced.artifacts.is_empty());
}
