// ABOUTME: Tests for ToolResult and Observation - constructors, JSON payloads,
// ABOUTME: metadata, and how results become recorded outcomes.

use super::*;

#[test]
fn test_text_result() {
    let result = ToolResult::text("Mean temperature: 8.08");
    assert_eq!(result.content, "Mean temperature: 8.08");
    assert!(!result.is_error);
    assert!(result.metadata.is_empty());
}

#[test]
fn test_error_result() {
    let result = ToolResult::error("country not found");
    assert_eq!(result.content, "country not found");
    assert!(result.is_error);
}

#[test]
fn test_json_result() {
    let result = ToolResult::json(&serde_json::json!({"mean_temperature": 6.8})).unwrap();
    assert!(!result.is_error);
    let parsed: serde_json::Value = serde_json::from_str(&result.content).unwrap();
    assert_eq!(parsed["mean_temperature"], 6.8);
}

#[test]
fn test_with_metadata() {
    let result = ToolResult::text("output")
        .with_metadata("records", 75)
        .with_metadata("filtered", true);

    assert_eq!(result.metadata["records"], 75);
    assert_eq!(result.metadata["filtered"], true);
}

#[test]
fn test_metadata_skipped_when_empty() {
    let json = serde_json::to_value(ToolResult::default()).unwrap();
    assert_eq!(json["content"], "");
    assert!(json.get("metadata").is_none());
}

#[test]
fn test_result_becomes_outcome() {
    let success = ToolOutcome::from(ToolResult::text("8.08").with_metadata("records", 3));
    let ToolOutcome::Success { content, metadata } = success else {
        panic!("expected success");
    };
    assert_eq!(content, "8.08");
    assert_eq!(metadata["records"], 3);

    let failure = ToolOutcome::from(ToolResult::error("no data for Atlantis"));
    assert_eq!(
        failure,
        ToolOutcome::Failure {
            kind: FailureKind::ToolExecution,
            message: "no data for Atlantis".to_string(),
        }
    );
}

#[test]
fn test_failure_render_is_labelled() {
    let observation = Observation {
        call: ToolCall::new("calculate_statistics", serde_json::json!({})),
        outcome: ToolOutcome::Failure {
            kind: FailureKind::InvalidArguments,
            message: "start_year must be an integer".to_string(),
        },
        duration: std::time::Duration::from_millis(3),
    };
    assert!(!observation.is_success());
    assert_eq!(observation.failure_kind(), Some(FailureKind::InvalidArguments));
    assert_eq!(
        observation.render(),
        "Error (invalid arguments): start_year must be an integer"
    );
}
