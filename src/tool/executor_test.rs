// ABOUTME: Tests for the Executor - unknown tools, invalid arguments, tool
// ABOUTME: failures and panics become observations; arguments reach tools intact.

use std::sync::{Arc, Mutex};

use serde_json::json;

use super::*;

/// Records the exact arguments it receives.
struct CaptureTool {
    seen: Arc<Mutex<Option<Arguments>>>,
}

#[async_trait::async_trait]
impl Tool for CaptureTool {
    fn name(&self) -> &str {
        "calculate_statistics"
    }

    fn description(&self) -> &str {
        "Calculate temperature statistics"
    }

    fn schema(&self) -> InputSchema {
        InputSchema::new()
            .param(ParamSpec::string("country").required())
            .param(ParamSpec::integer("start_year"))
    }

    fn consumes(&self) -> &[&str] {
        &["country", "start_year"]
    }

    async fn execute(&self, args: Arguments) -> Result<ToolResult, anyhow::Error> {
        *self.seen.lock().unwrap() = Some(args);
        Ok(ToolResult::text("ok").with_metadata("rows", 1))
    }
}

struct FailingTool;

#[async_trait::async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "failing"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn schema(&self) -> InputSchema {
        InputSchema::new()
    }

    fn consumes(&self) -> &[&str] {
        &[]
    }

    async fn execute(&self, _args: Arguments) -> Result<ToolResult, anyhow::Error> {
        Err(anyhow::anyhow!("dataset unavailable"))
    }
}

struct ReportsErrorTool;

#[async_trait::async_trait]
impl Tool for ReportsErrorTool {
    fn name(&self) -> &str {
        "reports_error"
    }

    fn description(&self) -> &str {
        "Returns an error result"
    }

    fn schema(&self) -> InputSchema {
        InputSchema::new()
    }

    fn consumes(&self) -> &[&str] {
        &[]
    }

    async fn execute(&self, _args: Arguments) -> Result<ToolResult, anyhow::Error> {
        Ok(ToolResult::error("country not found"))
    }
}

struct PanickingTool;

#[async_trait::async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "panicking"
    }

    fn description(&self) -> &str {
        "Panics"
    }

    fn schema(&self) -> InputSchema {
        InputSchema::new()
    }

    fn consumes(&self) -> &[&str] {
        &[]
    }

    async fn execute(&self, _args: Arguments) -> Result<ToolResult, anyhow::Error> {
        panic!("index out of bounds");
    }
}

fn executor() -> (Executor, Arc<Mutex<Option<Arguments>>>) {
    let seen = Arc::new(Mutex::new(None));
    let mut registry = Registry::new();
    registry.register(CaptureTool { seen: seen.clone() }).unwrap();
    registry.register(FailingTool).unwrap();
    registry.register(ReportsErrorTool).unwrap();
    registry.register(PanickingTool).unwrap();
    (Executor::new(Arc::new(registry)), seen)
}

#[tokio::test]
async fn test_arguments_reach_tool_unmodified() {
    let (executor, seen) = executor();
    let call = ToolCall::new(
        "calculate_statistics",
        json!({"country": "Austria", "start_year": 1980, "end_year": 1980}),
    );

    let observation = executor.execute(call.clone()).await;
    assert!(observation.is_success());
    assert_eq!(observation.call, call);

    let args = seen.lock().unwrap().clone().unwrap();
    assert_eq!(args.len(), 3);
    assert_eq!(args["country"], "Austria");
    assert_eq!(args["start_year"], 1980);
    assert_eq!(args["end_year"], 1980);
}

#[tokio::test]
async fn test_success_keeps_metadata() {
    let (executor, _) = executor();
    let observation = executor
        .execute(ToolCall::new("calculate_statistics", json!({"country": "Chile"})))
        .await;

    match observation.outcome {
        ToolOutcome::Success { content, metadata } => {
            assert_eq!(content, "ok");
            assert_eq!(metadata["rows"], 1);
        }
        other => panic!("Expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_tool_is_an_observation() {
    let (executor, _) = executor();
    let observation = executor
        .execute(ToolCall::new("weather_forecast", json!({})))
        .await;

    assert_eq!(observation.failure_kind(), Some(FailureKind::UnknownTool));
    let rendered = observation.render();
    assert!(rendered.contains("weather_forecast"));
    assert!(rendered.contains("calculate_statistics"));
}

#[tokio::test]
async fn test_invalid_arguments_is_an_observation() {
    let (executor, seen) = executor();
    let observation = executor
        .execute(ToolCall::new("calculate_statistics", json!({"start_year": 1980})))
        .await;

    assert_eq!(observation.failure_kind(), Some(FailureKind::InvalidArguments));
    assert!(seen.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_execution_error_is_an_observation() {
    let (executor, _) = executor();
    let observation = executor.execute(ToolCall::new("failing", json!({}))).await;

    assert_eq!(observation.failure_kind(), Some(FailureKind::ToolExecution));
    assert!(observation.render().contains("dataset unavailable"));
}

#[tokio::test]
async fn test_error_result_is_a_failure() {
    let (executor, _) = executor();
    let observation = executor.execute(ToolCall::new("reports_error", json!({}))).await;

    assert_eq!(observation.failure_kind(), Some(FailureKind::ToolExecution));
    assert!(observation.render().contains("country not found"));
}

#[tokio::test]
async fn test_panic_is_contained() {
    let (executor, _) = executor();
    let observation = executor.execute(ToolCall::new("panicking", json!({}))).await;

    assert_eq!(observation.failure_kind(), Some(FailureKind::ToolExecution));
    assert!(observation.render().contains("index out of bounds"));
}

#[tokio::test]
async fn test_observation_serialization() {
    let (executor, _) = executor();
    let observation = executor.execute(ToolCall::new("failing", json!({}))).await;

    let json = serde_json::to_value(&observation).unwrap();
    assert_eq!(json["call"]["name"], "failing");
    assert_eq!(json["outcome"]["status"], "failure");
    assert_eq!(json["outcome"]["kind"], "tool_execution");
    assert!(json["duration_ms"].is_u64());
}
