//! Flamegraph SVG rendering of a JSON query plan.
//!
//! Each plan node becomes a frame whose width is proportional to its
//! `Actual Total Time`. Children are stacked left to right under their
//! parent, one row per depth level.

use serde_json::Value;
use std::fmt::Write as _;
use thiserror::Error;

const WIDTH: f64 = 1200.0;
const FONT_SIZE: f64 = 12.0;
const FRAME_HEIGHT: f64 = FONT_SIZE + 4.0;
const MIN_FRAME_WIDTH: f64 = 1.0;
/// Frames narrower than this get no label.
const MIN_LABEL_WIDTH: f64 = 50.0;
/// Approximate width of one monospace character.
const CHAR_WIDTH: f64 = 7.0;

const PALETTE: [&str; 10] = [
    "#e74c3c", "#3498db", "#2ecc71", "#f39c12", "#9b59b6", "#1abc9c", "#e67e22", "#95a5a6",
    "#34495e", "#e91e63",
];

#[derive(Debug, Error)]
pub enum FlamegraphError {
    #[error("query plan is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("query plan has no top-level \"Plan\" node")]
    MissingPlan,
}

/// A laid-out plan node.
#[derive(Debug, Clone, PartialEq)]
struct Frame {
    label: String,
    time: f64,
    start: f64,
    depth: usize,
    children: Vec<Frame>,
}

/// Render the flamegraph SVG for an `EXPLAIN ... FORMAT JSON` document.
pub fn render_svg(plan_json: &str) -> Result<String, FlamegraphError> {
    let document: Value = serde_json::from_str(plan_json.trim())?;
    let plan = document
        .get(0)
        .and_then(|entry| entry.get("Plan"))
        .ok_or(FlamegraphError::MissingPlan)?;

    let root = layout(plan, 0, 0.0);
    Ok(render_document(&root))
}

fn layout(node: &Value, depth: usize, start: f64) -> Frame {
    let time = actual_time(node).unwrap_or(0.0);
    let mut children = Vec::new();
    let mut child_start = start;

    if let Some(plans) = node.get("Plans").and_then(Value::as_array) {
        for child in plans {
            let frame = layout(child, depth + 1, child_start);
            child_start += frame.time;
            children.push(frame);
        }
    }

    Frame {
        label: node_label(node),
        time,
        start,
        depth,
        children,
    }
}

fn actual_time(node: &Value) -> Option<f64> {
    node.get("Actual Total Time").and_then(Value::as_f64)
}

/// `Node Type (relation, idx:index, join) [12.3ms]`
fn node_label(node: &Value) -> String {
    let text = |key: &str| node.get(key).and_then(Value::as_str);

    let mut label = text("Node Type").unwrap_or("Unknown").to_string();

    let mut details = Vec::new();
    if let Some(relation) = text("Relation Name") {
        details.push(relation.to_string());
    }
    if let Some(index) = text("Index Name") {
        details.push(format!("idx:{}", index));
    }
    if let Some(join) = text("Join Type") {
        details.push(join.to_string());
    }
    if !details.is_empty() {
        let _ = write!(label, " ({})", details.join(", "));
    }

    if let Some(time) = actual_time(node) {
        let _ = write!(label, " [{}ms]", round(time, 2));
    }

    label
}

fn max_depth(frame: &Frame) -> usize {
    frame
        .children
        .iter()
        .map(max_depth)
        .max()
        .unwrap_or(frame.depth)
}

fn render_document(root: &Frame) -> String {
    let rows = max_depth(root) + 1;
    let height = rows as f64 * FRAME_HEIGHT + 40.0;
    let center = WIDTH / 2.0;

    let mut svg = String::new();
    let _ = writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        svg,
        r#"<svg width="{}" height="{}" xmlns="http://www.w3.org/2000/svg">"#,
        WIDTH, height
    );
    svg.push_str(
        "  <style>\n\
         \x20   .frame { stroke: white; stroke-width: 1; cursor: pointer; }\n\
         \x20   .frame:hover { stroke: black; stroke-width: 2; }\n\
         \x20   .frame-text { font-family: monospace; font-size: 12px; fill: white; pointer-events: none; }\n\
         \x20   .title { font-family: Arial; font-size: 16px; font-weight: bold; fill: #333; }\n\
         \x20   .subtitle { font-family: Arial; font-size: 12px; fill: #666; }\n\
         \x20 </style>\n",
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="20" class="title" text-anchor="middle">PostgreSQL Query Execution Plan Flamegraph</text>"#,
        center
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="35" class="subtitle" text-anchor="middle">Total Execution Time: {}ms</text>"#,
        center,
        round(root.time, 2)
    );
    svg.push_str("  <g transform=\"translate(0, 45)\">\n");
    render_frame(&mut svg, root, root.time, 0.0);
    svg.push_str("  </g>\n</svg>\n");

    svg
}

fn render_frame(svg: &mut String, frame: &Frame, total: f64, y: f64) {
    if frame.time <= 0.0 || total <= 0.0 {
        return;
    }

    let ratio = frame.time / total;
    let width = (WIDTH * ratio).max(MIN_FRAME_WIDTH);
    let x = frame.start / total * WIDTH;
    let label = escape_xml(&frame.label);

    let _ = writeln!(
        svg,
        r#"    <rect class="frame" x="{:.2}" y="{}" width="{:.2}" height="{}" fill="{}">"#,
        x,
        y,
        width,
        FRAME_HEIGHT,
        frame_color(&frame.label)
    );
    let _ = writeln!(
        svg,
        "      <title>{}\nTime: {}ms\nPercentage: {}%</title>",
        label,
        round(frame.time, 2),
        round(ratio * 100.0, 1)
    );
    svg.push_str("    </rect>\n");

    if width > MIN_LABEL_WIDTH {
        let text = truncate_label(&frame.label, width - 8.0);
        let _ = writeln!(
            svg,
            r#"    <text class="frame-text" x="{:.2}" y="{}">{}</text>"#,
            x + 4.0,
            y + FONT_SIZE + 1.0,
            escape_xml(&text)
        );
    }

    let child_y = y + FRAME_HEIGHT + 2.0;
    for child in &frame.children {
        render_frame(svg, child, total, child_y);
    }
}

/// Colour by operation family; everything else gets a stable palette colour.
fn frame_color(label: &str) -> &'static str {
    let node_type = label.split(" (").next().unwrap_or(label);
    if label.contains("Seq Scan") {
        "#e74c3c"
    } else if node_type.contains("Index") && node_type.contains("Scan") {
        "#2ecc71"
    } else if ["Hash Join", "Nested Loop", "Merge Join"]
        .iter()
        .any(|join| label.contains(join))
    {
        "#3498db"
    } else if label.contains("Sort") || label.contains("Aggregate") {
        "#f39c12"
    } else if label.contains("Result") {
        "#95a5a6"
    } else {
        PALETTE[stable_hash(label) % PALETTE.len()]
    }
}

/// FNV-1a; stable across runs so re-rendering a plan keeps its colours.
fn stable_hash(text: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash as usize
}

fn truncate_label(text: &str, max_width: f64) -> String {
    let max_chars = (max_width / CHAR_WIDTH).max(0.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn round(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_PLAN: &str = r#"[{"Plan": {"Node Type": "Seq Scan", "Relation Name": "users", "Actual Total Time": 45.23}}]"#;

    const JOIN_PLAN: &str = r#"[{"Plan": {
        "Node Type": "Hash Join",
        "Join Type": "Inner",
        "Actual Total Time": 123.45,
        "Plans": [
            {"Node Type": "Index Scan", "Relation Name": "users", "Index Name": "users_id_idx", "Actual Total Time": 56.78},
            {"Node Type": "Seq Scan", "Relation Name": "orders", "Actual Total Time": 67.89}
        ]
    }}]"#;

    #[test]
    fn test_render_simple_plan() {
        let svg = render_svg(SIMPLE_PLAN).unwrap();

        assert!(svg.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(svg.contains("PostgreSQL Query Execution Plan Flamegraph"));
        assert!(svg.contains("Total Execution Time: 45.23ms"));
        assert!(svg.contains("Seq Scan (users) [45.23ms]"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_render_join_plan_lays_out_children() {
        let svg = render_svg(JOIN_PLAN).unwrap();

        assert!(svg.contains("Hash Join (Inner) [123.45ms]"));
        assert!(svg.contains("Index Scan (users, idx:users_id_idx) [56.78ms]"));
        assert!(svg.contains("Seq Scan (orders) [67.89ms]"));
        assert_eq!(svg.matches("<rect").count(), 3);
    }

    #[test]
    fn test_layout_positions() {
        let document: Value = serde_json::from_str(JOIN_PLAN).unwrap();
        let root = layout(&document[0]["Plan"], 0, 0.0);

        assert_eq!(root.depth, 0);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].start, 0.0);
        assert_eq!(root.children[1].start, 56.78);
        assert_eq!(root.children[1].depth, 1);
        assert_eq!(max_depth(&root), 1);
    }

    #[test]
    fn test_zero_time_plan_has_no_frames() {
        let svg = render_svg(r#"[{"Plan": {"Node Type": "Result", "Actual Total Time": 0}}]"#)
            .unwrap();
        assert!(svg.contains("Total Execution Time: 0ms"));
        assert!(!svg.contains("<rect"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            render_svg("not json"),
            Err(FlamegraphError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_missing_plan() {
        assert!(matches!(
            render_svg(r#"[{"Query": 1}]"#),
            Err(FlamegraphError::MissingPlan)
        ));
        assert!(matches!(
            render_svg("{}"),
            Err(FlamegraphError::MissingPlan)
        ));
    }

    #[test]
    fn test_colors() {
        assert_eq!(frame_color("Seq Scan (users)"), "#e74c3c");
        assert_eq!(frame_color("Index Only Scan (users)"), "#2ecc71");
        assert_eq!(frame_color("Nested Loop"), "#3498db");
        assert_eq!(frame_color("Sort [1ms]"), "#f39c12");
        assert_eq!(frame_color("Result"), "#95a5a6");
        assert_eq!(frame_color("Gather"), frame_color("Gather"));
        assert!(PALETTE.contains(&frame_color("Gather")));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml(r#"a<b>&"c"'d'"#),
            "a&lt;b&gt;&amp;&quot;c&quot;&#39;d&#39;"
        );
    }

    #[test]
    fn test_labels_are_escaped_in_output() {
        let svg = render_svg(
            r#"[{"Plan": {"Node Type": "Seq Scan", "Relation Name": "a<b", "Actual Total Time": 1.0}}]"#,
        )
        .unwrap();
        assert!(svg.contains("a&lt;b"));
        assert!(!svg.contains("(a<b)"));
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short", 100.0), "short");
        assert_eq!(truncate_label("abcdefghijklmnop", 70.0), "abcdefg...");
    }
}
