// ABOUTME: Tests for the Evaluator - ordering, batch independence, judge
// ABOUTME: inputs and failures, and the JSON reports.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::agent::{AgentConfig, AgentContext, Controller, ModelGateway};
use crate::error::{EvalError, LlmError};
use crate::llm::ToolDefinition;
use crate::tool::{Executor, Registry};

/// Answers from a function of the context; optional delay keyed by question.
struct FnGateway<F> {
    reply: F,
}

#[async_trait]
impl<F> ModelGateway for FnGateway<F>
where
    F: Fn(&AgentContext) -> String + Send + Sync,
{
    async fn complete(
        &self,
        context: &AgentContext,
        _catalog: &[ToolDefinition],
    ) -> Result<String, LlmError> {
        if let Some(ms) = context.question().strip_prefix("sleep ") {
            let ms: u64 = ms.split_whitespace().next().unwrap().parse().unwrap();
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        Ok((self.reply)(context))
    }
}

fn evaluator<F>(reply: F) -> Evaluator
where
    F: Fn(&AgentContext) -> String + Send + Sync + 'static,
{
    let executor = Executor::new(Arc::new(Registry::new()));
    let controller = Controller::new(
        Arc::new(FnGateway { reply }),
        executor,
        AgentConfig::new().parse_retries(0),
    )
    .unwrap();
    Evaluator::new(controller)
}

/// Echoes the last word of the question as the answer, or babbles when
/// the question contains "babble".
fn echo_last_word(context: &AgentContext) -> String {
    let question = context.question();
    if question.contains("babble") {
        return "no markers here".to_string();
    }
    let word = question.split_whitespace().last().unwrap_or("");
    format!("Final Answer: {}", word)
}

struct RecordingJudge {
    seen: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Judge for RecordingJudge {
    fn name(&self) -> &str {
        "recording"
    }

    async fn judge(&self, response: &str, reference: &str) -> Result<Judgment, EvalError> {
        self.seen
            .lock()
            .unwrap()
            .push((response.to_string(), reference.to_string()));
        Ok(Judgment::new(0.5, "recorded"))
    }
}

#[tokio::test]
async fn test_failed_run_does_not_stop_batch() {
    let evaluator = evaluator(echo_last_word);
    let dataset = vec![
        EvalCase::new("1", "answer is 6.80", "6.80"),
        EvalCase::new("2", "please babble", "anything"),
        EvalCase::new("3", "answer is 2020", "2020"),
    ];

    let summary = evaluator.run(&dataset, &ExactMatchJudge).await;

    let scores: Vec<f64> = summary.results.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![1.0, 0.0, 1.0]);
    assert!((summary.average_score - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.failed_runs(), 1);

    let failed = &summary.results[1];
    assert!(failed.reasoning.contains("Agent failed"));
    assert!(failed.reasoning.contains("could not be parsed"));
    assert!(!failed.outcome.as_ref().unwrap().is_success());
    assert_eq!(failed.contexts.len(), 1);
}

#[tokio::test]
async fn test_concurrent_cases_keep_dataset_order() {
    let evaluator = evaluator(echo_last_word).concurrency(3);
    let dataset = vec![
        EvalCase::new("a", "sleep 60 first", "first"),
        EvalCase::new("b", "sleep 1 second", "second"),
        EvalCase::new("c", "sleep 30 third", "third"),
    ];

    let summary = evaluator.run(&dataset, &ExactMatchJudge).await;
    let ids: Vec<&str> = summary.results.iter().map(|r| r.case.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(summary.average_score, 1.0);
}

#[tokio::test]
async fn test_judge_sees_only_response_and_reference() {
    let judge = RecordingJudge {
        seen: Mutex::new(Vec::new()),
    };
    let evaluator = evaluator(echo_last_word);
    let dataset = vec![EvalCase::new("1", "temperature was 8.08°C", "6.80°C")];

    let summary = evaluator.run(&dataset, &judge).await;
    assert_eq!(summary.results[0].score, 0.5);
    assert_eq!(
        *judge.seen.lock().unwrap(),
        vec![("8.08°C".to_string(), "6.80°C".to_string())]
    );
}

#[tokio::test]
async fn test_judge_error_scores_zero() {
    let evaluator = evaluator(echo_last_word);
    let dataset = vec![EvalCase::new("1", "answer 6.80", "unknown")];

    let summary = evaluator.run(&dataset, &NumericJudge::default()).await;
    let result = &summary.results[0];
    assert_eq!(result.score, 0.0);
    assert_eq!(result.response, "6.80");
    assert!(result.reasoning.contains("contains no number"));
}

#[tokio::test]
async fn test_each_case_gets_a_fresh_context() {
    let lengths = Arc::new(Mutex::new(Vec::new()));
    let seen = lengths.clone();
    let evaluator = evaluator(move |context: &AgentContext| {
        seen.lock().unwrap().push(context.len());
        "Final Answer: x".to_string()
    });
    let dataset: Vec<EvalCase> = (1..=4)
        .map(|i| EvalCase::new(i.to_string(), format!("question {}", i), "x"))
        .collect();

    let summary = evaluator.run(&dataset, &ExactMatchJudge).await;
    assert_eq!(summary.average_score, 1.0);
    assert_eq!(*lengths.lock().unwrap(), vec![1, 1, 1, 1]);

    let run_ids: std::collections::HashSet<&str> = summary
        .results
        .iter()
        .map(|r| r.outcome.as_ref().unwrap().run_id.as_str())
        .collect();
    assert_eq!(run_ids.len(), 4);
}

#[tokio::test]
async fn test_empty_dataset() {
    let summary = evaluator(echo_last_word).run(&[], &ExactMatchJudge).await;
    assert_eq!(summary.average_score, 0.0);
    assert!(summary.results.is_empty());
}

#[tokio::test]
async fn test_write_report() {
    let evaluator = evaluator(echo_last_word);
    let dataset = vec![
        EvalCase::new("1", "answer is 6.80°C", "6.80°C"),
        EvalCase::new("2", "babble", "x"),
    ];
    let summary = evaluator.run(&dataset, &ExactMatchJudge).await;

    let root = tempfile::tempdir().unwrap();
    let dir = report_dir(root.path(), "simple_test");
    let paths = write_report(&summary, "exact_match", &dir).await.unwrap();
    assert_eq!(paths.evaluator_output, dir.join("exact_match_output.json"));

    let output: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.evaluator_output).unwrap()).unwrap();
    assert_eq!(output["average_score"], 0.5);
    let item = &output["eval_output_items"][0];
    assert_eq!(item["id"], "1");
    assert_eq!(item["score"], 1.0);
    assert_eq!(item["reasoning"]["user_input"], "answer is 6.80°C");
    assert_eq!(item["reasoning"]["reference"], "6.80°C");
    assert_eq!(item["reasoning"]["response"], "6.80°C");
    assert!(item["reasoning"]["retrieved_contexts"][0]
        .as_str()
        .unwrap()
        .starts_with("**Step 1**"));

    let workflow: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.workflow_output).unwrap()).unwrap();
    assert_eq!(workflow[0]["succeeded"], true);
    assert_eq!(workflow[1]["succeeded"], false);
    assert_eq!(workflow[0]["intermediate_steps"][0]["role"], "user");

    let summary_file: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.summary).unwrap()).unwrap();
    assert_eq!(summary_file["failed_runs"], 1);
    assert_eq!(summary_file["cases"], 2);
}

#[tokio::test]
async fn test_run_many_runs_each_case_once() {
    let calls = Arc::new(Mutex::new(0usize));
    let counter = calls.clone();
    let evaluator = evaluator(move |context: &AgentContext| {
        *counter.lock().unwrap() += 1;
        echo_last_word(context)
    });
    let dataset = vec![
        EvalCase::new("1", "answer is 6.8", "6.80°C"),
        EvalCase::new("2", "answer is 2020", "2020"),
    ];

    let numeric = NumericJudge::default();
    let summaries = evaluator
        .run_many(&dataset, &[&ExactMatchJudge, &numeric])
        .await;

    assert_eq!(*calls.lock().unwrap(), 2);
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].average_score, 0.5);
    assert_eq!(summaries[1].average_score, 1.0);
    assert_eq!(
        summaries[0].results[0].outcome.as_ref().unwrap().run_id,
        summaries[1].results[0].outcome.as_ref().unwrap().run_id
    );
}
