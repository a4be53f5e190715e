use crate::document::DocumentProcessor;
use crate::error::Result;
use crate::exec::{ExecutionOutcome, ExecutionRequest, ExecutionService};
use crate::languages::InvocationOptions;
use crate::splice::ResultSplicer;
use crate::visualize::PlanSubmitter;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// A request as seen by [`ScriptedExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedCall {
    pub language: String,
    pub content: String,
    pub options: InvocationOptions,
}

type Script = Box<dyn FnMut(&ExecutionRequest<'_>) -> Result<ExecutionOutcome>>;

/// In-memory execution service; answers every request with a closure.
pub(crate) struct ScriptedExecutor {
    script: Script,
    calls: Rc<RefCell<Vec<RecordedCall>>>,
}

impl ScriptedExecutor {
    pub(crate) fn new(
        script: impl FnMut(&ExecutionRequest<'_>) -> Result<ExecutionOutcome> + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: Rc::default(),
        }
    }

    /// Every block succeeds with the same output.
    pub(crate) fn always(stdout: &str) -> Self {
        let stdout = stdout.to_string();
        Self::new(move |_| Ok(ExecutionOutcome::success(stdout.clone())))
    }

    /// Every block fails with this outcome.
    pub(crate) fn failing(exit_code: i32, stdout: &str, stderr: &str) -> Self {
        let outcome = ExecutionOutcome::failure(Some(exit_code), stdout, stderr);
        Self::new(move |_| Ok(outcome.clone()))
    }

    /// Outputs numbered by call: `run 1`, `run 2`, ...
    pub(crate) fn counting() -> Self {
        let mut count = 0;
        Self::new(move |_| {
            count += 1;
            Ok(ExecutionOutcome::success(format!("run {}\n", count)))
        })
    }

    /// Handle on the recorded calls that outlives the executor.
    pub(crate) fn calls(&self) -> Rc<RefCell<Vec<RecordedCall>>> {
        Rc::clone(&self.calls)
    }
}

impl ExecutionService for ScriptedExecutor {
    fn execute(&mut self, request: &ExecutionRequest<'_>) -> Result<ExecutionOutcome> {
        self.calls.borrow_mut().push(RecordedCall {
            language: request.language.to_string(),
            content: request.content.to_string(),
            options: request.options,
        });
        (self.script)(request)
    }
}

/// Plan submitter that hands out `https://plans.test/<n>` links.
#[derive(Debug, Clone, Default)]
pub(crate) struct CannedSubmitter {
    submitted: Rc<RefCell<Vec<String>>>,
}

impl CannedSubmitter {
    pub(crate) fn submitted(&self) -> Vec<String> {
        self.submitted.borrow().clone()
    }
}

impl PlanSubmitter for CannedSubmitter {
    fn submit(&self, plan_json: &str) -> Option<String> {
        let mut submitted = self.submitted.borrow_mut();
        submitted.push(plan_json.to_string());
        Some(format!("https://plans.test/{}", submitted.len()))
    }
}

pub(crate) const SIMPLE_PLAN: &str =
    r#"[{"Plan": {"Node Type": "Seq Scan", "Relation Name": "users", "Actual Total Time": 45.23}}]"#;

/// Process `input` once with `executor` and a [`CannedSubmitter`].
pub(crate) fn process_with(
    executor: &mut ScriptedExecutor,
    submitter: &CannedSubmitter,
    work_dir: &Path,
    input: &str,
) -> String {
    let splicer = ResultSplicer::new(Box::new(submitter.clone()));
    DocumentProcessor::new(executor, splicer, work_dir)
        .process(input)
        .unwrap()
}
