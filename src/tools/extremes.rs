// ABOUTME: FindExtremeYearsTool - the warmest or coldest years, globally or
// ABOUTME: for one country.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::dataset::{ClimateDataset, RecordFilter, round2};
use super::{int_arg, str_arg};
use crate::tool::{Arguments, InputSchema, ParamSpec, Tool, ToolResult};

pub struct FindExtremeYearsTool {
    data: Arc<ClimateDataset>,
}

impl FindExtremeYearsTool {
    pub fn new(data: Arc<ClimateDataset>) -> Self {
        Self { data }
    }
}

#[derive(Serialize)]
struct YearTemperature {
    year: i32,
    temperature: f64,
}

#[derive(Serialize)]
struct Extremes<'a> {
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    country: Option<&'a str>,
    years: Vec<YearTemperature>,
}

#[async_trait]
impl Tool for FindExtremeYearsTool {
    fn name(&self) -> &str {
        "find_extreme_years"
    }

    fn description(&self) -> &str {
        "Find the warmest or coldest years in the dataset"
    }

    fn schema(&self) -> InputSchema {
        InputSchema::new()
            .param(
                ParamSpec::string("kind")
                    .describe("Which extreme to look for")
                    .one_of(["warmest", "coldest"])
                    .default_value("warmest"),
            )
            .param(
                ParamSpec::integer("n")
                    .describe("How many years to return")
                    .range(Some(1.0), Some(50.0))
                    .default_value(5),
            )
            .param(ParamSpec::string("country").describe("Country name or code; omit for global"))
    }

    fn consumes(&self) -> &[&str] {
        &["kind", "n", "country"]
    }

    async fn execute(&self, args: Arguments) -> Result<ToolResult, anyhow::Error> {
        let kind = str_arg(&args, "kind").unwrap_or("warmest");
        let n = int_arg(&args, "n")?.unwrap_or(5).max(1) as usize;
        let country = str_arg(&args, "country").filter(|c| !c.is_empty());

        let mut years: Vec<(i32, f64)> = self
            .data
            .yearly_means(&RecordFilter {
                country,
                ..Default::default()
            })
            .into_iter()
            .collect();
        if years.is_empty() {
            return Ok(ToolResult::error(format!(
                "No temperature data for {}",
                country.unwrap_or("any country")
            )));
        }

        if kind == "coldest" {
            years.sort_by(|a, b| a.1.total_cmp(&b.1));
        } else {
            years.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
        years.truncate(n);

        Ok(ToolResult::json(&Extremes {
            kind,
            country,
            years: years
                .into_iter()
                .map(|(year, t)| YearTemperature {
                    year,
                    temperature: round2(t),
                })
                .collect(),
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::dataset::fixtures;
    use serde_json::{Value, json};

    async fn run(value: Value) -> Value {
        let Value::Object(args) = value else { panic!("object expected") };
        let tool = FindExtremeYearsTool::new(Arc::new(fixtures::sample()));
        let result = tool.execute(args).await.unwrap();
        serde_json::from_str(&result.content).unwrap()
    }

    #[tokio::test]
    async fn test_warmest_years_for_country() {
        let body = run(json!({"kind": "warmest", "n": 2, "country": "Austria"})).await;
        assert_eq!(body["years"][0]["year"], 2020);
        assert_eq!(body["years"][1]["year"], 2000);
        assert_eq!(body["years"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_coldest_global() {
        let body = run(json!({"kind": "coldest", "n": 1})).await;
        assert_eq!(body["kind"], "coldest");
        assert!(body.get("country").is_none());
        assert_eq!(body["years"][0]["year"], 1980);
    }

    #[tokio::test]
    async fn test_defaults_when_args_missing() {
        let body = run(json!({})).await;
        assert_eq!(body["kind"], "warmest");
        assert_eq!(body["years"].as_array().unwrap().len(), 3);
    }
}
