// ABOUTME: Country tools - list the countries in the dataset and summarize
// ABOUTME: the records available for one country.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::dataset::{ClimateDataset, RecordFilter, round2};
use super::str_arg;
use crate::tool::{Arguments, InputSchema, ParamSpec, Tool, ToolResult};

/// Lists every country with data.
pub struct ListCountriesTool {
    data: Arc<ClimateDataset>,
}

impl ListCountriesTool {
    pub fn new(data: Arc<ClimateDataset>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for ListCountriesTool {
    fn name(&self) -> &str {
        "list_countries"
    }

    fn description(&self) -> &str {
        "List all available countries in the dataset"
    }

    fn schema(&self) -> InputSchema {
        InputSchema::new()
    }

    fn consumes(&self) -> &[&str] {
        &[]
    }

    async fn execute(&self, _args: Arguments) -> Result<ToolResult, anyhow::Error> {
        #[derive(Serialize)]
        struct Countries<'a> {
            count: usize,
            countries: Vec<&'a str>,
        }
        let countries = self.data.countries();
        Ok(ToolResult::json(&Countries {
            count: countries.len(),
            countries,
        })?)
    }
}

/// Summarizes the records for one country.
pub struct FilterByCountryTool {
    data: Arc<ClimateDataset>,
}

impl FilterByCountryTool {
    pub fn new(data: Arc<ClimateDataset>) -> Self {
        Self { data }
    }
}

#[derive(Serialize)]
struct CountrySummary<'a> {
    country: &'a str,
    country_code: &'a str,
    record_count: usize,
    years: String,
    latest_year: i32,
    latest_temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    station_count: Option<u32>,
}

#[async_trait]
impl Tool for FilterByCountryTool {
    fn name(&self) -> &str {
        "filter_by_country"
    }

    fn description(&self) -> &str {
        "Get information about the climate data for a specific country: years covered, \
         latest temperature and number of weather stations"
    }

    fn schema(&self) -> InputSchema {
        InputSchema::new().param(
            ParamSpec::string("country")
                .describe("Country name or code")
                .required(),
        )
    }

    fn consumes(&self) -> &[&str] {
        &["country"]
    }

    async fn execute(&self, args: Arguments) -> Result<ToolResult, anyhow::Error> {
        let country = str_arg(&args, "country").unwrap_or_default();
        let records = self.data.select(&RecordFilter {
            country: Some(country),
            ..Default::default()
        });

        let (Some(first), Some(latest)) = (records.first(), records.last()) else {
            return Ok(ToolResult::error(format!(
                "No data for country '{}'. Use list_countries to see what is available.",
                country
            )));
        };

        Ok(ToolResult::json(&CountrySummary {
            country: &latest.country_name,
            country_code: &latest.country_code,
            record_count: records.len(),
            years: format!("{}-{}", first.year, latest.year),
            latest_year: latest.year,
            latest_temperature: round2(latest.avg_temp),
            station_count: records.iter().rev().find_map(|r| r.station_count),
        })?)
    }
}
