// ABOUTME: Climate analysis tools over an annual temperature dataset.
// ABOUTME: Includes listing, per-country summaries, statistics, extremes, and stations.

mod countries;
mod dataset;
mod extremes;
mod statistics;
mod stations;

use std::sync::Arc;

use anyhow::anyhow;

pub use countries::{FilterByCountryTool, ListCountriesTool};
pub use dataset::{
    ClimateDataset, RecordFilter, TemperatureRecord, mean, round2, std_dev, trend_per_decade,
};
pub use extremes::FindExtremeYearsTool;
pub use statistics::CalculateStatisticsTool;
pub use stations::StationStatisticsTool;

use crate::tool::{Arguments, Tool};

/// Every climate tool, sharing one dataset.
pub fn climate_tools(data: Arc<ClimateDataset>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListCountriesTool::new(data.clone())),
        Arc::new(CalculateStatisticsTool::new(data.clone())),
        Arc::new(FilterByCountryTool::new(data.clone())),
        Arc::new(FindExtremeYearsTool::new(data.clone())),
        Arc::new(StationStatisticsTool::new(data)),
    ]
}

pub(crate) fn str_arg<'a>(args: &'a Arguments, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str()).map(str::trim)
}

// Integers may arrive as whole floats (1980.0) from lenient parsing.
pub(crate) fn int_arg(args: &Arguments, key: &str) -> Result<Option<i32>, anyhow::Error> {
    let Some(value) = args.get(key).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    if let Some(i) = value.as_i64() {
        return i32::try_from(i)
            .map(Some)
            .map_err(|_| anyhow!("'{}' is out of range: {}", key, i));
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= f64::from(i32::MAX) => Ok(Some(f as i32)),
        _ => Err(anyhow!("'{}' must be an integer, got {}", key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Registry;
    use serde_json::json;

    #[test]
    fn test_climate_tools_register_cleanly() {
        let mut registry = Registry::new();
        for tool in climate_tools(Arc::new(ClimateDataset::default())) {
            registry.register_arc(tool).unwrap();
        }
        assert_eq!(
            registry.list(),
            vec![
                "list_countries",
                "calculate_statistics",
                "filter_by_country",
                "find_extreme_years",
                "station_statistics",
            ]
        );
    }

    #[test]
    fn test_int_arg() {
        let args = match json!({"a": 1980, "b": 1980.0, "c": 1980.5, "d": null, "e": "x"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(int_arg(&args, "a").unwrap(), Some(1980));
        assert_eq!(int_arg(&args, "b").unwrap(), Some(1980));
        assert!(int_arg(&args, "c").is_err());
        assert_eq!(int_arg(&args, "d").unwrap(), None);
        assert!(int_arg(&args, "e").is_err());
        assert_eq!(int_arg(&args, "missing").unwrap(), None);
    }
}
