//! Query plan visualization.
//!
//! A JSON query plan (the output of `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)`)
//! can be turned into two kinds of artifacts:
//!
//! - a link to the plan on a remote visualization service ([`dalibo`])
//! - a flamegraph SVG rendered locally ([`flamegraph`])
//!
//! Neither may fail a run: problems are logged and the artifact is dropped.

pub mod dalibo;
pub mod flamegraph;

pub use dalibo::{DEFAULT_ENDPOINT, DaliboClient};
pub use flamegraph::{FlamegraphError, render_svg};

/// Submits a JSON query plan and returns the URL where it can be viewed.
pub trait PlanSubmitter {
    /// Never fails: any problem yields `None`.
    fn submit(&self, plan_json: &str) -> Option<String>;
}

/// A submitter that never produces links (`--no-submit`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSubmitter;

impl PlanSubmitter for DisabledSubmitter {
    fn submit(&self, _plan_json: &str) -> Option<String> {
        None
    }
}
