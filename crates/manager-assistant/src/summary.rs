//! Descriptive statistics for the dataset.
//!
//! [`summarize`] re-reads the CSV on every call and describes each numeric
//! column with count, mean, sample standard deviation, min, the three
//! quartiles and max. [`get_summary`] wraps it into a payload that never
//! fails.

use crate::dataset::{dataset_file_name, float_values, is_numeric_dtype, read_dataset};
use crate::error::SummaryError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::Path;
use tracing::{debug, warn};

/// Statistics for one numeric column.
///
/// Values that are undefined for the column (e.g. `std` of a single value)
/// serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStatistics {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnStatistics {
    /// Describe a column; `None` entries are skipped.
    pub fn describe(values: &[Option<f64>]) -> Self {
        let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        if count == 0 {
            return Self {
                count,
                mean: None,
                std: None,
                min: None,
                q25: None,
                median: None,
                q75: None,
                max: None,
            };
        }

        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let variance =
                sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            Some(variance.sqrt())
        } else {
            None
        };

        Self {
            count,
            mean: Some(mean),
            std,
            min: sorted.first().copied(),
            q25: Some(quantile(&sorted, 0.25)),
            median: Some(quantile(&sorted, 0.5)),
            q75: Some(quantile(&sorted, 0.75)),
            max: sorted.last().copied(),
        }
    }
}

/// Linearly interpolated quantile of a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Per-column statistics in dataset column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSummary {
    columns: Vec<(String, ColumnStatistics)>,
}

impl DatasetSummary {
    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnStatistics)> {
        self.columns.iter().map(|(name, stats)| (name.as_str(), stats))
    }

    pub fn get(&self, column: &str) -> Option<&ColumnStatistics> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, stats)| stats)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Serialized as a JSON object keyed by column name, preserving order.
impl Serialize for DatasetSummary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, stats) in &self.columns {
            map.serialize_entry(name, stats)?;
        }
        map.end()
    }
}

/// Result payload of [`get_summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryReport {
    Summary(DatasetSummary),
    Error { error: String },
}

impl From<Result<DatasetSummary, SummaryError>> for SummaryReport {
    fn from(result: Result<DatasetSummary, SummaryError>) -> Self {
        match result {
            Ok(summary) => Self::Summary(summary),
            Err(e) => Self::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Read the dataset and describe every numeric column.
pub fn summarize(path: &Path) -> Result<DatasetSummary, SummaryError> {
    let file_name = dataset_file_name(path);
    let df = read_dataset(path).map_err(|e| SummaryError::from_read(&file_name, e))?;

    let mut columns = Vec::new();
    for col in df.get_columns() {
        if !is_numeric_dtype(col.dtype()) {
            continue;
        }
        let name = col.name().to_string();
        let values =
            float_values(&df, &name).map_err(|e| SummaryError::from_read(&file_name, e))?;
        columns.push((name, ColumnStatistics::describe(&values)));
    }

    debug!(
        "Summarized {} numeric columns over {} rows",
        columns.len(),
        df.height()
    );
    Ok(DatasetSummary { columns })
}

/// Summarize the dataset, converting every failure into an error payload.
pub fn get_summary(path: &Path) -> SummaryReport {
    let result = summarize(path);
    if let Err(ref e) = result {
        warn!("Dataset summary failed: {}", e);
    }
    result.into()
}
