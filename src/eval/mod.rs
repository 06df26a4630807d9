// ABOUTME: Evaluation module - datasets, judges, the batch evaluator, and
// ABOUTME: JSON reports of its results.

mod dataset;
mod evaluator;
mod judge;
mod report;

pub use dataset::{EvalCase, load_dataset, parse_dataset};
pub use evaluator::{EvalResult, EvalSummary, Evaluator};
pub use judge::{
    DEFAULT_TOLERANCE, ExactMatchJudge, Judge, Judgment, LlmJudge, NumericJudge, parse_verdict,
};
pub use report::{ReportPaths, report_dir, write_report};

#[cfg(test)]
mod evaluator_test;
