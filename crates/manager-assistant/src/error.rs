//! Error types for the manager assistant.
//!
//! Errors fall into two tiers:
//!
//! - **Startup-fatal**: [`ModelError`] (the churn model could not be trained),
//!   a missing API key and invalid configuration. These are wrapped in
//!   [`AssistantError`] and abort the process.
//! - **Per-request**: [`SummaryError`] and [`PredictionError`]. These are
//!   caught at the point of use and turned into a reply string or an
//!   `{"error": ...}` payload; the process keeps accepting input.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Failure while reading the dataset file into a DataFrame.
///
/// Both the summarizer and the churn model read through the same loader and
/// translate this into their own error wording.
#[derive(Error, Debug)]
pub enum DatasetReadError {
    /// The file does not exist.
    #[error("file not found")]
    NotFound,

    /// The file exists but holds no data.
    #[error("file is empty")]
    Empty,

    /// Any other IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars failed to parse the CSV or a column.
    #[error("{0}")]
    Polars(#[from] polars::error::PolarsError),

    /// A required column is absent.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),
}

/// Errors from the dataset summarizer.
///
/// The display strings are the user-facing `error` payload values.
#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("File {0} not found.")]
    NotFound(String),

    #[error("File {0} is empty.")]
    Empty(String),

    #[error("{0}")]
    Failed(String),
}

impl SummaryError {
    pub(crate) fn from_read(file_name: &str, err: DatasetReadError) -> Self {
        match err {
            DatasetReadError::NotFound => Self::NotFound(file_name.to_string()),
            DatasetReadError::Empty => Self::Empty(file_name.to_string()),
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Errors raised while training the churn model at startup.
///
/// These are never absorbed into a payload.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("The {0} file was not found.")]
    DatasetNotFound(String),

    #[error("The {0} file is empty.")]
    DatasetEmpty(String),

    #[error("An error occurred while loading the dataset: {0}")]
    Load(String),
}

impl ModelError {
    pub(crate) fn from_read(file_name: &str, err: DatasetReadError) -> Self {
        match err {
            DatasetReadError::NotFound => Self::DatasetNotFound(file_name.to_string()),
            DatasetReadError::Empty => Self::DatasetEmpty(file_name.to_string()),
            other => Self::Load(other.to_string()),
        }
    }
}

/// Errors from a single churn prediction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Tenure must be a non-negative number.")]
    InvalidTenure,

    #[error("MonthlyCharges must be a non-negative number.")]
    InvalidMonthlyCharges,

    /// The category was never seen while fitting the one-hot encoder.
    #[error("Found unknown category '{value}' in column '{column}' during transform")]
    UnknownCategory { column: String, value: String },

    /// Feature vector shape did not match the fitted model.
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// The crate-level error type, used for startup and the CLI surface.
#[derive(Error, Debug)]
pub enum AssistantError {
    /// The churn model could not be trained.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The LLM credential is not configured.
    #[error("{0} is not set in .env")]
    MissingApiKey(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// The LLM client could not be set up.
    #[error("LLM client error: {0}")]
    Provider(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssistantError {
    /// Get error code for front-end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Model(ModelError::DatasetNotFound(_)) => "DATASET_NOT_FOUND",
            Self::Model(ModelError::DatasetEmpty(_)) => "DATASET_EMPTY",
            Self::Model(ModelError::Load(_)) => "MODEL_TRAINING_FAILED",
            Self::MissingApiKey(_) => "MISSING_API_KEY",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Provider(_) => "PROVIDER_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// The `{code, message}` payload as a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }

    /// Whether this error must abort startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Model(_) | Self::MissingApiKey(_) | Self::InvalidConfig(_) | Self::Provider(_)
        )
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for AssistantError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AssistantError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for startup-tier operations.
pub type Result<T> = std::result::Result<T, AssistantError>;
