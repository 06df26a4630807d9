// ABOUTME: CalculateStatisticsTool - temperature statistics for the whole
// ABOUTME: dataset or one country, optionally limited to a year range.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::dataset::{ClimateDataset, RecordFilter, mean, round2, std_dev, trend_per_decade};
use super::{int_arg, str_arg};
use crate::tool::{Arguments, InputSchema, ParamSpec, Tool, ToolResult};

/// Mean, spread, extremes and warming trend of temperature records.
pub struct CalculateStatisticsTool {
    data: Arc<ClimateDataset>,
}

impl CalculateStatisticsTool {
    pub fn new(data: Arc<ClimateDataset>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for CalculateStatisticsTool {
    fn name(&self) -> &str {
        "calculate_statistics"
    }

    fn description(&self) -> &str {
        "Calculate temperature statistics globally or for a specific country, optionally \
         restricted to a range of years. Returns mean, standard deviation, min, max, \
         trend per decade and the years analyzed."
    }

    fn schema(&self) -> InputSchema {
        InputSchema::new()
            .param(ParamSpec::string("country").describe("Country name or code; omit for all countries"))
            .param(ParamSpec::integer("start_year").describe("First year to include"))
            .param(ParamSpec::integer("end_year").describe("Last year to include"))
    }

    fn consumes(&self) -> &[&str] {
        &["country", "start_year", "end_year"]
    }

    async fn execute(&self, args: Arguments) -> Result<ToolResult, anyhow::Error> {
        let country = str_arg(&args, "country").filter(|c| !c.is_empty());
        let filter = RecordFilter {
            country,
            start_year: int_arg(&args, "start_year")?,
            end_year: int_arg(&args, "end_year")?,
        };

        let yearly = self.data.yearly_means(&filter);
        let (Some((first, _)), Some((last, _))) = (yearly.first_key_value(), yearly.last_key_value())
        else {
            return Ok(ToolResult::error(format!(
                "No temperature data for {}{}",
                country.unwrap_or("any country"),
                year_range_label(&filter)
            )));
        };

        let temps: Vec<f64> = yearly.values().copied().collect();
        let points: Vec<(i32, f64)> = yearly.iter().map(|(y, t)| (*y, *t)).collect();
        let min = temps.iter().copied().fold(f64::INFINITY, f64::min);
        let max = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut stats = Map::new();
        if let Some(c) = country {
            stats.insert("country".into(), json!(c));
        }
        stats.insert("mean_temperature".into(), json!(round2(mean(&temps).unwrap_or(0.0))));
        stats.insert("std_dev".into(), json!(round2(std_dev(&temps))));
        stats.insert("min_temperature".into(), json!(round2(min)));
        stats.insert("max_temperature".into(), json!(round2(max)));
        stats.insert(
            "trend_per_decade".into(),
            trend_per_decade(&points).map_or(Value::Null, |t| json!(round2(t))),
        );
        stats.insert("years_analyzed".into(), json!(format!("{}-{}", first, last)));
        stats.insert("record_count".into(), json!(self.data.select(&filter).len()));

        Ok(ToolResult::json(&Value::Object(stats))?)
    }
}

fn year_range_label(filter: &RecordFilter<'_>) -> String {
    match (filter.start_year, filter.end_year) {
        (Some(s), Some(e)) if s == e => format!(" in {}", s),
        (Some(s), Some(e)) => format!(" between {} and {}", s, e),
        (Some(s), None) => format!(" from {}", s),
        (None, Some(e)) => format!(" up to {}", e),
        (None, None) => String::new(),
    }
}
