//! Dataset loading shared by the summarizer and the churn model.

use crate::error::DatasetReadError;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Column names the churn model reads.
pub const TENURE: &str = "tenure";
pub const CONTRACT: &str = "Contract";
pub const INTERNET_SERVICE: &str = "InternetService";
pub const MONTHLY_CHARGES: &str = "MonthlyCharges";
pub const CHURN: &str = "Churn";

/// File name component of `path`, used in user-facing error messages.
pub fn dataset_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Read the CSV at `path` into a DataFrame.
///
/// The whole file is read on every call. A file made only of whitespace
/// counts as empty.
pub fn read_dataset(path: &Path) -> Result<DataFrame, DatasetReadError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DatasetReadError::NotFound);
        }
        Err(e) => return Err(DatasetReadError::Io(e)),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(DatasetReadError::Empty);
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    debug!("Read {} with shape {:?}", path.display(), df.shape());
    Ok(df)
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, DatasetReadError> {
    df.column(name)
        .map(|col| col.as_materialized_series())
        .map_err(|_| DatasetReadError::ColumnNotFound(name.to_string()))
}

/// Values of a column as `f64`; nulls and unparsable entries become `None`.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DatasetReadError> {
    let float_series = series(df, name)?.cast(&DataType::Float64)?;
    let values = float_series.f64()?.into_iter().collect();
    Ok(values)
}

/// Values of a column as strings; nulls become `None`.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, DatasetReadError> {
    let str_series = series(df, name)?.cast(&DataType::String)?;
    let values = str_series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}
