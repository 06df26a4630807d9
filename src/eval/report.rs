// ABOUTME: Evaluation reports - writes per-evaluator scores, the workflow
// ABOUTME: output with full traces, and a short summary as JSON files.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::EvalSummary;
use crate::error::EvalError;
use crate::trace::TraceEntry;

#[derive(Debug, Serialize)]
struct EvaluatorOutput<'a> {
    average_score: f64,
    eval_output_items: Vec<OutputItem<'a>>,
}

#[derive(Debug, Serialize)]
struct OutputItem<'a> {
    id: &'a str,
    score: f64,
    reasoning: ItemReasoning<'a>,
}

#[derive(Debug, Serialize)]
struct ItemReasoning<'a> {
    user_input: &'a str,
    reference: &'a str,
    response: &'a str,
    retrieved_contexts: &'a [String],
    judge_reasoning: &'a str,
}

#[derive(Debug, Serialize)]
struct WorkflowItem<'a> {
    id: &'a str,
    question: &'a str,
    answer: &'a str,
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<&'a str>,
    intermediate_steps: Vec<TraceEntry>,
}

#[derive(Debug, Serialize)]
struct SummaryFile<'a> {
    evaluator: &'a str,
    cases: usize,
    failed_runs: usize,
    average_score: f64,
    scores: Vec<CaseScore<'a>>,
}

#[derive(Debug, Serialize)]
struct CaseScore<'a> {
    id: &'a str,
    score: f64,
}

/// Files produced by `write_report`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub evaluator_output: PathBuf,
    pub workflow_output: PathBuf,
    pub summary: PathBuf,
}

/// Directory for one named evaluation under an output root.
pub fn report_dir(output_dir: impl AsRef<Path>, eval_name: &str) -> PathBuf {
    output_dir.as_ref().join(eval_name)
}

/// Write `<evaluator>_output.json`, `workflow_output.json` and
/// `eval_summary.json` into `dir`, creating it if needed.
pub async fn write_report(
    summary: &EvalSummary,
    evaluator: &str,
    dir: impl AsRef<Path>,
) -> Result<ReportPaths, EvalError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| EvalError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let items = summary
        .results
        .iter()
        .map(|r| OutputItem {
            id: &r.case.id,
            score: r.score,
            reasoning: ItemReasoning {
                user_input: &r.case.user_input,
                reference: &r.case.reference,
                response: &r.response,
                retrieved_contexts: &r.contexts,
                judge_reasoning: &r.reasoning,
            },
        })
        .collect();
    let evaluator_output = dir.join(format!("{}_output.json", evaluator));
    write_json(
        &evaluator_output,
        &EvaluatorOutput {
            average_score: summary.average_score,
            eval_output_items: items,
        },
    )
    .await?;

    let workflow: Vec<WorkflowItem> = summary
        .results
        .iter()
        .map(|r| WorkflowItem {
            id: &r.case.id,
            question: &r.case.user_input,
            answer: &r.response,
            succeeded: r.outcome.as_ref().is_some_and(|o| o.is_success()),
            run_id: r.outcome.as_ref().map(|o| o.run_id.as_str()),
            intermediate_steps: r
                .outcome
                .as_ref()
                .map(|o| o.trace.entries())
                .unwrap_or_default(),
        })
        .collect();
    let workflow_output = dir.join("workflow_output.json");
    write_json(&workflow_output, &workflow).await?;

    let summary_path = dir.join("eval_summary.json");
    write_json(
        &summary_path,
        &SummaryFile {
            evaluator,
            cases: summary.results.len(),
            failed_runs: summary.failed_runs(),
            average_score: summary.average_score,
            scores: summary
                .results
                .iter()
                .map(|r| CaseScore {
                    id: &r.case.id,
                    score: r.score,
                })
                .collect(),
        },
    )
    .await?;

    Ok(ReportPaths {
        evaluator_output,
        workflow_output,
        summary: summary_path,
    })
}

async fn write_json(path: &Path, value: &impl Serialize) -> Result<(), EvalError> {
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| EvalError::Io {
            path: path.to_path_buf(),
            source,
        })
}
