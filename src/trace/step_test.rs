// ABOUTME: Tests for Step and Trace - flattened entries, evaluation contexts,
// ABOUTME: and reconstructing the prompt behind any step.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use super::*;
use crate::agent::{Turn, TurnRole};
use crate::tool::{FailureKind, Observation, ToolCall, ToolOutcome};

fn action_step(index: usize, iteration: usize, call: ToolCall, outcome: ToolOutcome) -> Step {
    let output = format!(
        "Thought: look it up\nAction: {}\nAction Input: {}",
        call.name, call.arguments
    );
    let observation = Observation {
        call: call.clone(),
        outcome,
        duration: Duration::from_millis(3),
    };
    let appended = vec![
        Turn::assistant(output.clone()),
        Turn::tool(format!("Observation: {}", observation.render())),
    ];
    let mut step = Step::new(
        iteration,
        1,
        output,
        Some("look it up".to_string()),
        StepKind::Action { call, observation },
        appended,
    );
    step.index = index;
    step
}

fn sample_trace() -> Trace {
    let call = ToolCall::new("calculate_statistics", json!({"country": "Austria", "year": 1980}));
    let first = action_step(
        1,
        1,
        call,
        ToolOutcome::Success {
            content: r#"{"mean": 6.8}"#.to_string(),
            metadata: HashMap::new(),
        },
    );

    let mut parse = Step::new(
        2,
        1,
        "I think it is about 7 degrees",
        None,
        StepKind::ParseError {
            error: "missing markers".to_string(),
            correction: Some("Use the format".to_string()),
        },
        vec![
            Turn::assistant("I think it is about 7 degrees"),
            Turn::user("Use the format"),
        ],
    );
    parse.index = 2;

    let mut last = Step::new(
        2,
        2,
        "Final Answer: 6.80°C",
        None,
        StepKind::FinalAnswer {
            answer: "6.80°C".to_string(),
        },
        vec![Turn::assistant("Final Answer: 6.80°C")],
    );
    last.index = 3;

    Trace {
        run_id: "run-1".to_string(),
        input: "What was the average temperature in Austria in 1980?".to_string(),
        started_at: Utc::now(),
        finished_at: Utc::now(),
        steps: vec![first, parse, last],
    }
}

#[test]
fn test_step_accessors() {
    let trace = sample_trace();
    assert_eq!(trace.steps[0].tool_call().unwrap().name, "calculate_statistics");
    assert!(trace.steps[0].observation().unwrap().is_success());
    assert!(trace.steps[1].tool_call().is_none());
    assert!(trace.steps[2].observation().is_none());
    assert_eq!(trace.tool_calls(), 1);
}

#[test]
fn test_entries_flatten_turns() {
    let trace = sample_trace();
    let entries = trace.entries();

    let roles: Vec<TurnRole> = entries.iter().map(|e| e.role).collect();
    assert_eq!(
        roles,
        vec![
            TurnRole::User,
            TurnRole::Assistant,
            TurnRole::Tool,
            TurnRole::Assistant,
            TurnRole::User,
            TurnRole::Assistant,
        ]
    );
    assert!(entries.iter().all(|e| !e.content.is_empty()));

    assert_eq!(entries[1].tool_name.as_deref(), Some("calculate_statistics"));
    assert_eq!(entries[1].tool_input.as_ref().unwrap()["year"], 1980);
    assert!(matches!(entries[2].tool_output, Some(ToolOutcome::Success { .. })));
    assert!(entries[4].tool_name.is_none());
}

#[test]
fn test_contexts_include_tool_responses() {
    let trace = sample_trace();
    let contexts = trace.contexts();
    assert_eq!(contexts.len(), 4);
    assert!(contexts[0].starts_with("**Step 1**\nThought: look it up"));
    assert_eq!(contexts[1], r#"{"mean": 6.8}"#);
    assert!(contexts[3].starts_with("**Step 3**"));
}

#[test]
fn test_contexts_render_failures() {
    let call = ToolCall::new("nope", json!({}));
    let step = action_step(
        1,
        1,
        call,
        ToolOutcome::Failure {
            kind: FailureKind::UnknownTool,
            message: "no tool named 'nope'".to_string(),
        },
    );
    let trace = Trace {
        run_id: "r".to_string(),
        input: "q".to_string(),
        started_at: Utc::now(),
        finished_at: Utc::now(),
        steps: vec![step],
    };
    assert_eq!(trace.contexts()[1], "Error (unknown tool): no tool named 'nope'");
}

#[test]
fn test_prompt_for_replays_context() {
    let trace = sample_trace();

    let first = trace.prompt_for(1).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].content, trace.input);

    let third = trace.prompt_for(3).unwrap();
    let roles: Vec<TurnRole> = third.iter().map(|t| t.role).collect();
    assert_eq!(
        roles,
        vec![
            TurnRole::User,
            TurnRole::Assistant,
            TurnRole::Tool,
            TurnRole::Assistant,
            TurnRole::User,
        ]
    );
    assert_eq!(third[4].content, "Use the format");

    assert!(trace.prompt_for(0).is_none());
    assert!(trace.prompt_for(4).is_none());
}

#[test]
fn test_trace_serializes_step_kinds() {
    let trace = sample_trace();
    let json = serde_json::to_value(&trace).unwrap();
    assert_eq!(json["steps"][0]["kind"]["type"], "action");
    assert_eq!(json["steps"][0]["kind"]["observation"]["outcome"]["status"], "success");
    assert_eq!(json["steps"][1]["kind"]["type"], "parse_error");
    assert_eq!(json["steps"][2]["kind"]["answer"], "6.80°C");
    assert!(json["steps"][1].get("thought").is_none());
}
