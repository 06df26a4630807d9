// ABOUTME: Evaluator - replays a dataset through fresh controller runs and
// ABOUTME: scores each response with a pluggable judge.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use super::{EvalCase, Judge};
use crate::agent::{Controller, RunOutcome};

/// The scored result of one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    pub case: EvalCase,

    /// The final answer, or the failure description if the run failed.
    pub response: String,

    /// Per-step contexts from the run's trace.
    pub contexts: Vec<String>,

    pub score: f64,
    pub reasoning: String,

    /// The full run, absent only if its trace could not be recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,
}

/// All results of one evaluation, in dataset order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSummary {
    pub average_score: f64,
    pub results: Vec<EvalResult>,
}

impl EvalSummary {
    fn from_results(results: Vec<EvalResult>) -> Self {
        let average_score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64
        };
        Self {
            average_score,
            results,
        }
    }

    /// Number of cases whose agent run did not produce an answer.
    pub fn failed_runs(&self) -> usize {
        self.results
            .iter()
            .filter(|r| !r.outcome.as_ref().is_some_and(RunOutcome::is_success))
            .count()
    }
}

/// Runs evaluation batches against one controller.
pub struct Evaluator {
    controller: Controller,
    concurrency: usize,
}

impl Evaluator {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            concurrency: 1,
        }
    }

    /// Evaluate up to `n` cases at once. Results keep dataset order.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Run every case and score it. One failing case never stops the batch.
    pub async fn run(&self, dataset: &[EvalCase], judge: &dyn Judge) -> EvalSummary {
        tracing::info!(
            cases = dataset.len(),
            judge = judge.name(),
            concurrency = self.concurrency,
            "evaluation started"
        );

        let results: Vec<EvalResult> = stream::iter(dataset.iter().map(|case| {
            let span = tracing::info_span!("eval_case", id = %case.id);
            async move {
                let run = self.execute(case).await;
                score(&run, judge).await
            }
            .instrument(span)
        }))
        .buffered(self.concurrency)
        .collect()
        .await;

        finish(results)
    }

    /// Run every case once and score the same runs with several judges.
    /// Returns one summary per judge, in the order given.
    pub async fn run_many(&self, dataset: &[EvalCase], judges: &[&dyn Judge]) -> Vec<EvalSummary> {
        tracing::info!(
            cases = dataset.len(),
            judges = judges.len(),
            concurrency = self.concurrency,
            "evaluation started"
        );

        let runs: Vec<CaseRun> = stream::iter(dataset.iter().map(|case| {
            let span = tracing::info_span!("eval_case", id = %case.id);
            self.execute(case).instrument(span)
        }))
        .buffered(self.concurrency)
        .collect()
        .await;

        let mut summaries = Vec::with_capacity(judges.len());
        for judge in judges {
            let results: Vec<EvalResult> = stream::iter(runs.iter().map(|run| score(run, *judge)))
                .buffered(self.concurrency)
                .collect()
                .await;
            summaries.push(finish(results));
        }
        summaries
    }

    async fn execute<'a>(&self, case: &'a EvalCase) -> CaseRun<'a> {
        let outcome = self.controller.run(&case.user_input).await.map_err(|e| {
            tracing::error!(error = %e, "run could not be traced");
            format!("Agent run failed: {}", e)
        });
        CaseRun { case, outcome }
    }
}

struct CaseRun<'a> {
    case: &'a EvalCase,
    outcome: Result<RunOutcome, String>,
}

async fn score(run: &CaseRun<'_>, judge: &dyn Judge) -> EvalResult {
    let case = run.case;
    let outcome = match &run.outcome {
        Ok(outcome) => outcome,
        Err(reason) => {
            return EvalResult {
                case: case.clone(),
                response: String::new(),
                contexts: Vec::new(),
                score: 0.0,
                reasoning: reason.clone(),
                outcome: None,
            };
        }
    };

    let (response, score, reasoning) = match outcome.answer() {
        Some(answer) => match judge.judge(answer, &case.reference).await {
            Ok(judgment) => (answer.to_string(), judgment.score, judgment.reasoning),
            Err(e) => {
                tracing::warn!(id = %case.id, error = %e, "judge failed");
                (answer.to_string(), 0.0, e.to_string())
            }
        },
        None => (outcome.response_text(), 0.0, outcome.response_text()),
    };
    tracing::debug!(id = %case.id, score, "case scored");

    EvalResult {
        case: case.clone(),
        response,
        contexts: outcome.trace.contexts(),
        score,
        reasoning,
        outcome: Some(outcome.clone()),
    }
}

fn finish(results: Vec<EvalResult>) -> EvalSummary {
    let summary = EvalSummary::from_results(results);
    tracing::info!(
        average_score = summary.average_score,
        failed_runs = summary.failed_runs(),
        "evaluation finished"
    );
    summary
}
