// ABOUTME: StationStatisticsTool - how many weather stations back the data,
// ABOUTME: in total and per country.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::dataset::ClimateDataset;
use crate::tool::{Arguments, InputSchema, Tool, ToolResult};

/// Number of countries listed in `countries_with_most_stations`.
const TOP_COUNTRIES: usize = 5;

pub struct StationStatisticsTool {
    data: Arc<ClimateDataset>,
}

impl StationStatisticsTool {
    pub fn new(data: Arc<ClimateDataset>) -> Self {
        Self { data }
    }
}

#[derive(Serialize)]
struct CountryStations<'a> {
    country: &'a str,
    stations: u32,
}

#[derive(Serialize)]
struct StationStatistics<'a> {
    total_stations: u64,
    countries_with_most_stations: Vec<CountryStations<'a>>,
    stations_per_country: BTreeMap<&'a str, u32>,
}

#[async_trait]
impl Tool for StationStatisticsTool {
    fn name(&self) -> &str {
        "station_statistics"
    }

    fn description(&self) -> &str {
        "Get statistics on the weather stations used in the data: total count, the \
         countries with the most stations, and the count for every country"
    }

    fn schema(&self) -> InputSchema {
        InputSchema::new()
    }

    fn consumes(&self) -> &[&str] {
        &[]
    }

    async fn execute(&self, _args: Arguments) -> Result<ToolResult, anyhow::Error> {
        let per_country = self.data.stations_per_country();
        if per_country.is_empty() {
            return Ok(ToolResult::error("The dataset has no station counts"));
        }

        let mut ranked: Vec<CountryStations> = per_country
            .iter()
            .map(|(country, stations)| CountryStations {
                country: *country,
                stations: *stations,
            })
            .collect();
        ranked.sort_by(|a, b| b.stations.cmp(&a.stations).then(a.country.cmp(b.country)));
        ranked.truncate(TOP_COUNTRIES);

        Ok(ToolResult::json(&StationStatistics {
            total_stations: per_country.values().map(|s| u64::from(*s)).sum(),
            countries_with_most_stations: ranked,
            stations_per_country: per_country,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::dataset::fixtures;
    use serde_json::Value;

    #[tokio::test]
    async fn test_station_statistics() {
        let tool = StationStatisticsTool::new(Arc::new(fixtures::sample()));
        let result = tool.execute(Arguments::new()).await.unwrap();
        let body: Value = serde_json::from_str(&result.content).unwrap();

        assert_eq!(body["total_stations"], 12 + 42 + 35);
        assert_eq!(body["countries_with_most_stations"][0]["country"], "France");
        assert_eq!(body["countries_with_most_stations"][2]["country"], "Austria");
        assert_eq!(body["stations_per_country"]["Canada"], 35);
    }

    #[tokio::test]
    async fn test_no_station_data() {
        let tool = StationStatisticsTool::new(Arc::new(ClimateDataset::default()));
        let result = tool.execute(Arguments::new()).await.unwrap();
        assert!(result.is_error);
    }
}
