// ABOUTME: ClimateDataset - annual per-country temperature records shared
// ABOUTME: read-only by the climate tools, plus the statistics they compute.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One country's average temperature for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRecord {
    pub country_code: String,
    pub country_name: String,
    pub year: i32,
    #[serde(alias = "temperature")]
    pub avg_temp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station_count: Option<u32>,
}

/// Which records a query covers. Years are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter<'a> {
    pub country: Option<&'a str>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

impl RecordFilter<'_> {
    fn matches(&self, record: &TemperatureRecord) -> bool {
        let country_ok = self.country.is_none_or(|c| {
            record.country_name.eq_ignore_ascii_case(c) || record.country_code.eq_ignore_ascii_case(c)
        });
        country_ok
            && self.start_year.is_none_or(|y| record.year >= y)
            && self.end_year.is_none_or(|y| record.year <= y)
    }
}

/// Read-only temperature table.
#[derive(Debug, Clone, Default)]
pub struct ClimateDataset {
    records: Vec<TemperatureRecord>,
}

impl ClimateDataset {
    pub fn from_records(mut records: Vec<TemperatureRecord>) -> Self {
        records.sort_by(|a, b| {
            a.country_name
                .cmp(&b.country_name)
                .then(a.year.cmp(&b.year))
        });
        Self { records }
    }

    /// Load a JSON array of records.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let records: Vec<TemperatureRecord> =
            serde_json::from_str(&text).map_err(|e| ConfigError::Data {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), records = records.len(), "climate data loaded");
        Ok(Self::from_records(records))
    }

    pub fn records(&self) -> &[TemperatureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Country names, sorted.
    pub fn countries(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self.records.iter().map(|r| r.country_name.as_str()).collect();
        names.into_iter().collect()
    }

    /// Records matching a filter, ordered by country then year.
    pub fn select(&self, filter: &RecordFilter<'_>) -> Vec<&TemperatureRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }

    /// Mean temperature per year over the matching records.
    pub fn yearly_means(&self, filter: &RecordFilter<'_>) -> BTreeMap<i32, f64> {
        let mut sums: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for record in self.select(filter) {
            let entry = sums.entry(record.year).or_insert((0.0, 0));
            entry.0 += record.avg_temp;
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(year, (sum, n))| (year, sum / n as f64))
            .collect()
    }

    /// Station count per country, taken from each country's latest record
    /// that reports one.
    pub fn stations_per_country(&self) -> BTreeMap<&str, u32> {
        let mut stations = BTreeMap::new();
        for record in &self.records {
            if let Some(count) = record.station_count {
                // Records are sorted by year within a country.
                stations.insert(record.country_name.as_str(), count);
            }
        }
        stations
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation; 0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(m) = mean(values) else {
        return 0.0;
    };
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Least-squares slope of value over year, scaled to degrees per decade.
pub fn trend_per_decade(points: &[(i32, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| f64::from(*x)).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| *y).sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in points {
        let dx = f64::from(*x) - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    if den == 0.0 {
        return None;
    }
    Some(num / den * 10.0)
}

/// Round to two decimals for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
