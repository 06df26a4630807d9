// ABOUTME: Integration tests verifying modules work together.
// ABOUTME: Drives a configured workflow end to end with a scripted model client.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reagent::config::{BuildContext, FunctionConfig};
use reagent::llm::{StopReason, Usage};
use reagent::prelude::*;
use reagent::tools::{RecordFilter, mean, round2};
use serde_json::{Value, json};

const CLIMATE_DATA: &str = r#"[
    {"country_code": "AUT", "country_name": "Austria", "year": 1980, "avg_temp": 6.80, "station_count": 10},
    {"country_code": "AUT", "country_name": "Austria", "year": 2000, "avg_temp": 8.50, "station_count": 11},
    {"country_code": "AUT", "country_name": "Austria", "year": 2020, "avg_temp": 8.94, "station_count": 12},
    {"country_code": "FRA", "country_name": "France", "year": 1980, "avg_temp": 11.20, "station_count": 40},
    {"country_code": "FRA", "country_name": "France", "year": 2020, "avg_temp": 12.90, "station_count": 42}
]"#;

const EVAL_DATA: &str =
    r#"[{"id": "austria_1980", "user_input": "What was Austria's average temperature in 1980?", "reference": "6.80°C"}]"#;

const CONFIG: &str = r#"
llms:
  climate_llm:
    _type: nim
    model_name: meta/llama-3.1-70b-instruct
    temperature: 0.0
functions:
  calculate_statistics:
    _type: climate_analyzer/calculate_statistics
    data_path: temps.json
  list_countries:
    _type: climate_analyzer/list_countries
    data_path: temps.json
workflow:
  _type: react_agent
  llm_name: climate_llm
  tool_names: [list_countries, calculate_statistics]
  max_iterations: 5
eval:
  general:
    dataset: {file_path: eval.json}
    output_dir: out
    eval_name: regression
  evaluators:
    exact: {_type: exact_match}
    numeric: {_type: numeric_match}
"#;

/// Asks for Austria's 1980 statistics, then reports the mean it was given.
struct StatisticsModel;

#[async_trait]
impl LlmClient for StatisticsModel {
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError> {
        let last = req.messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let text = match last.strip_prefix("Observation: ") {
            Some(observation) => {
                let stats: Value = serde_json::from_str(observation)
                    .map_err(|e| LlmError::Configuration(e.to_string()))?;
                let mean = stats["mean_temperature"].as_f64().unwrap_or(f64::NAN);
                format!("Thought: I have the statistics.\nFinal Answer: {:.2}°C", mean)
            }
            None => "Thought: I need Austria's statistics for 1980.\n\
                     Action: calculate_statistics\n\
                     Action Input: {\"country\": \"Austria\", \"start_year\": 1980, \"end_year\": 1980}"
                .to_string(),
        };
        Ok(Response {
            id: "scripted".into(),
            model: req.model.clone(),
            text,
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }
}

fn scripted_client(_: &reagent::config::LlmConfig) -> Result<Arc<dyn LlmClient>, ConfigError> {
    Ok(Arc::new(StatisticsModel))
}

/// Accepts a year range but averages every year of the country.
struct UnfilteredStatisticsTool {
    data: Arc<ClimateDataset>,
}

#[async_trait]
impl Tool for UnfilteredStatisticsTool {
    fn name(&self) -> &str {
        "calculate_statistics"
    }

    fn description(&self) -> &str {
        "Calculate temperature statistics for a country"
    }

    fn schema(&self) -> InputSchema {
        InputSchema::new()
            .param(ParamSpec::string("country"))
            .param(ParamSpec::integer("start_year"))
            .param(ParamSpec::integer("end_year"))
    }

    fn consumes(&self) -> &[&str] {
        &["country", "start_year", "end_year"]
    }

    async fn execute(&self, args: Arguments) -> Result<ToolResult, anyhow::Error> {
        let country = args.get("country").and_then(|v| v.as_str());
        let filter = RecordFilter {
            country,
            ..Default::default()
        };
        let temps: Vec<f64> = self.data.select(&filter).iter().map(|r| r.avg_temp).collect();
        let mean = round2(mean(&temps).unwrap_or(0.0));
        Ok(ToolResult::json(&json!({"mean_temperature": mean}))?)
    }
}

fn unfiltered_factory() -> ToolFactory {
    let mut factory = ToolFactory::builtin();
    factory.register(
        "climate_analyzer/calculate_statistics",
        |function: &FunctionConfig, ctx: &BuildContext| {
            let path = function.option_str("data_path").unwrap_or("temps.json");
            let tool: Arc<dyn Tool> = Arc::new(UnfilteredStatisticsTool {
                data: ctx.climate_dataset(path)?,
            });
            Ok(tool)
        },
    );
    factory
}

fn workflow_in(dir: &Path, factory: &ToolFactory) -> Workflow {
    std::fs::write(dir.join("temps.json"), CLIMATE_DATA).unwrap();
    std::fs::write(dir.join("eval.json"), EVAL_DATA).unwrap();
    std::fs::write(dir.join("config.yml"), CONFIG).unwrap();
    let config = WorkflowConfig::load(dir.join("config.yml")).unwrap();
    Workflow::build_with(&config, factory, &scripted_client).unwrap()
}

#[tokio::test]
async fn test_unfiltered_statistics_give_wrong_answer() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = workflow_in(dir.path(), &unfiltered_factory());

    let outcome = workflow
        .controller()
        .run("What was Austria's average temperature in 1980?")
        .await
        .unwrap();
    assert_eq!(outcome.answer(), Some("8.08°C"));

    let reports = workflow.evaluate().await.unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.summary.average_score == 0.0));
}

#[tokio::test]
async fn test_year_filtered_statistics_give_right_answer() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = workflow_in(dir.path(), &ToolFactory::builtin());

    let outcome = workflow
        .controller()
        .run("What was Austria's average temperature in 1980?")
        .await
        .unwrap();
    assert_eq!(outcome.answer(), Some("6.80°C"));
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.tool_calls, 1);

    let call = outcome.trace.steps[0].tool_call().unwrap();
    assert_eq!(call.name, "calculate_statistics");
    assert_eq!(call.arguments["start_year"], 1980);

    let reports = workflow.evaluate().await.unwrap();
    assert!(reports.iter().all(|r| r.summary.average_score == 1.0));

    let report_dir = dir.path().join("out").join("regression");
    let workflow_output: Value = serde_json::from_str(
        &std::fs::read_to_string(report_dir.join("workflow_output.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(workflow_output[0]["id"], "austria_1980");
    assert_eq!(workflow_output[0]["answer"], "6.80°C");
    assert!(report_dir.join("exact_output.json").exists());
    assert!(report_dir.join("numeric_output.json").exists());
}

#[tokio::test]
async fn test_registry_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = workflow_in(dir.path(), &ToolFactory::builtin());
    let registry = workflow.registry();

    assert_eq!(registry.list(), vec!["list_countries", "calculate_statistics"]);
    let catalog = registry.catalog();
    assert_eq!(catalog[1].name, "calculate_statistics");
    assert!(catalog[1].input_schema["properties"]["start_year"].is_object());

    let observation = workflow
        .controller()
        .executor()
        .execute(ToolCall::new("list_countries", json!({})))
        .await;
    assert!(observation.is_success());
    let listed: Value = serde_json::from_str(&observation.render()).unwrap();
    assert_eq!(listed["count"], 2);
}

#[tokio::test]
async fn test_service_over_configured_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = workflow_in(dir.path(), &ToolFactory::builtin());
    let service = AgentService::new(workflow.controller().clone(), "climate");

    let request: ChatRequest = serde_json::from_value(json!({
        "messages": [{"role": "user", "content": "What was Austria's average temperature in 1980?"}]
    }))
    .unwrap();

    let response = service.complete(&request).await.unwrap();
    assert_eq!(response.choices[0].message.content, "6.80°C");

    let chunks: Vec<ChatChunk> = service.stream(&request).map(|c| c.unwrap()).collect().await;
    let last = chunks.last().unwrap();
    assert_eq!(last.choices[0].delta.content.as_deref(), Some("6.80°C"));
    assert_eq!(last.choices[0].finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_shipped_config_builds() {
    // SAFETY: no other test reads this variable.
    unsafe { std::env::set_var("NVIDIA_API_KEY", "nvapi-test") };
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/climate.yml");
    let config = WorkflowConfig::load(&path).unwrap();
    let workflow = Workflow::build_with(&config, &ToolFactory::builtin(), &scripted_client).unwrap();

    assert_eq!(workflow.registry().len(), 5);
    assert_eq!(workflow.controller().config().max_iterations, 10);
    assert_eq!(workflow.eval().unwrap().judges.len(), 2);

    let outcome = workflow
        .controller()
        .run("What was Austria's average temperature in 1980?")
        .await
        .unwrap();
    assert_eq!(outcome.answer(), Some("6.80°C"));
}
