//! Churn probability classifier.
//!
//! [`ChurnModel::train`] fits a preprocessing-plus-classifier pipeline over
//! the whole dataset exactly once:
//!
//! - `tenure` and `MonthlyCharges` are passed through unchanged
//! - `Contract` and `InternetService` are one-hot encoded, with categories
//!   learned from the data
//! - an L2-regularized logistic regression is fitted on `Churn`
//!   (`Yes` -> 1, `No` -> 0)
//!
//! The fitted model is an ordinary immutable value. It is never retrained:
//! if the CSV changes after startup, the model is stale until restart.
//!
//! # Example
//!
//! ```rust,ignore
//! use manager_assistant::churn::{ChurnModel, ChurnRequest};
//!
//! let model = ChurnModel::train("dataset.csv".as_ref())?;
//! let request = ChurnRequest::new(12.0, "Two year", "Fiber optic", 90.0);
//! match model.predict_churn(&request) {
//!     Ok(p) => println!("churn probability: {:.2}%", p * 100.0),
//!     Err(e) => println!("error: {e}"),
//! }
//! ```

use crate::dataset::{
    CHURN, CONTRACT, INTERNET_SERVICE, MONTHLY_CHARGES, TENURE, dataset_file_name, float_values,
    read_dataset, string_values,
};
use crate::error::{DatasetReadError, ModelError, PredictionError};
use linfa::prelude::*;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// L2 penalty applied to the logistic regression weights.
const L2_PENALTY: f64 = 1.0;

/// Upper bound on solver iterations.
const MAX_ITERATIONS: u64 = 100;

/// Customer fields a prediction is made from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRequest {
    /// Months as a customer.
    pub tenure: f64,
    /// Contract type, e.g. "Month-to-month".
    pub contract: String,
    /// Internet service type, e.g. "Fiber optic".
    pub internet_service: String,
    /// Monthly charges.
    pub monthly_charges: f64,
}

impl ChurnRequest {
    pub fn new(
        tenure: f64,
        contract: impl Into<String>,
        internet_service: impl Into<String>,
        monthly_charges: f64,
    ) -> Self {
        Self {
            tenure,
            contract: contract.into(),
            internet_service: internet_service.into(),
            monthly_charges,
        }
    }

    /// Reject negative or non-finite numeric fields.
    pub fn validate(&self) -> Result<(), PredictionError> {
        if !self.tenure.is_finite() || self.tenure < 0.0 {
            return Err(PredictionError::InvalidTenure);
        }
        if !self.monthly_charges.is_finite() || self.monthly_charges < 0.0 {
            return Err(PredictionError::InvalidMonthlyCharges);
        }
        Ok(())
    }
}

/// Prediction payload: `{"churn_probability": p}` or `{"error": msg}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    Probability { churn_probability: f64 },
    Error { error: String },
}

impl From<Result<f64, PredictionError>> for PredictionOutcome {
    fn from(result: Result<f64, PredictionError>) -> Self {
        match result {
            Ok(churn_probability) => Self::Probability { churn_probability },
            Err(e) => Self::Error {
                error: e.to_string(),
            },
        }
    }
}

/// One-hot encoder for a single categorical column.
///
/// Categories are sorted; an unseen value is an error at transform time.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotEncoder {
    column: String,
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit<'a>(column: impl Into<String>, values: impl IntoIterator<Item = &'a str>) -> Self {
        let categories: BTreeSet<&str> = values.into_iter().collect();
        Self {
            column: column.into(),
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Append the one-hot slots for `value` to `row`.
    pub fn encode_into(&self, value: &str, row: &mut Vec<f64>) -> Result<(), PredictionError> {
        let index = self
            .categories
            .iter()
            .position(|c| c == value)
            .ok_or_else(|| PredictionError::UnknownCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })?;

        row.extend((0..self.categories.len()).map(|i| if i == index { 1.0 } else { 0.0 }));
        Ok(())
    }
}

/// Column transformer: numeric passthrough followed by one-hot blocks.
#[derive(Debug, Clone)]
struct FeatureEncoder {
    contract: OneHotEncoder,
    internet_service: OneHotEncoder,
}

impl FeatureEncoder {
    fn width(&self) -> usize {
        2 + self.contract.width() + self.internet_service.width()
    }

    fn feature_names(&self) -> Vec<String> {
        let mut names = vec![TENURE.to_string(), MONTHLY_CHARGES.to_string()];
        for encoder in [&self.contract, &self.internet_service] {
            names.extend(
                encoder
                    .categories()
                    .iter()
                    .map(|c| format!("{}_{}", encoder.column(), c)),
            );
        }
        names
    }

    fn encode_row(
        &self,
        tenure: f64,
        contract: &str,
        internet_service: &str,
        monthly_charges: f64,
    ) -> Result<Vec<f64>, PredictionError> {
        let mut row = Vec::with_capacity(self.width());
        row.push(tenure);
        row.push(monthly_charges);
        self.contract.encode_into(contract, &mut row)?;
        self.internet_service.encode_into(internet_service, &mut row)?;
        Ok(row)
    }
}

/// Training rows pulled out of the DataFrame, nulls rejected.
struct TrainingData {
    tenure: Vec<f64>,
    contract: Vec<String>,
    internet_service: Vec<String>,
    monthly_charges: Vec<f64>,
    churn: Vec<usize>,
}

impl TrainingData {
    fn from_path(path: &Path) -> Result<Self, ModelError> {
        let file_name = dataset_file_name(path);
        let read_err = |e: DatasetReadError| ModelError::from_read(&file_name, e);

        let df = read_dataset(path).map_err(read_err)?;
        if df.height() == 0 {
            return Err(ModelError::Load("dataset has no rows".to_string()));
        }

        let tenure = required_floats(float_values(&df, TENURE).map_err(read_err)?, TENURE)?;
        let monthly_charges = required_floats(
            float_values(&df, MONTHLY_CHARGES).map_err(read_err)?,
            MONTHLY_CHARGES,
        )?;
        let contract =
            required_strings(string_values(&df, CONTRACT).map_err(read_err)?, CONTRACT)?;
        let internet_service = required_strings(
            string_values(&df, INTERNET_SERVICE).map_err(read_err)?,
            INTERNET_SERVICE,
        )?;

        let churn = string_values(&df, CHURN)
            .map_err(read_err)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value.as_deref() {
                Some("Yes") => Ok(1),
                Some("No") => Ok(0),
                other => Err(ModelError::Load(format!(
                    "column '{}' has value {:?} on line {}, expected \"Yes\" or \"No\"",
                    CHURN,
                    other,
                    csv_line(row)
                ))),
            })
            .collect::<Result<Vec<usize>, _>>()?;

        if !churn.contains(&0) || !churn.contains(&1) {
            return Err(ModelError::Load(format!(
                "column '{}' must contain both \"Yes\" and \"No\" values",
                CHURN
            )));
        }

        Ok(Self {
            tenure,
            contract,
            internet_service,
            monthly_charges,
            churn,
        })
    }

    fn len(&self) -> usize {
        self.churn.len()
    }
}

/// 1-based line in the CSV file of data row `row`, counting the header.
fn csv_line(row: usize) -> usize {
    row + 2
}

fn required_floats(values: Vec<Option<f64>>, column: &str) -> Result<Vec<f64>, ModelError> {
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.filter(|v| v.is_finite()).ok_or_else(|| {
                ModelError::Load(format!(
                    "column '{}' has a missing or non-numeric value on line {}",
                    column,
                    csv_line(row)
                ))
            })
        })
        .collect()
}

fn required_strings(values: Vec<Option<String>>, column: &str) -> Result<Vec<String>, ModelError> {
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                ModelError::Load(format!(
                    "column '{}' has a missing value on line {}",
                    column,
                    csv_line(row)
                ))
            })
        })
        .collect()
}

/// The fitted churn classifier.
pub struct ChurnModel {
    encoder: FeatureEncoder,
    classifier: FittedLogisticRegression<f64, usize>,
    training_rows: usize,
}

impl fmt::Debug for ChurnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChurnModel")
            .field("features", &self.encoder.feature_names())
            .field("training_rows", &self.training_rows)
            .finish()
    }
}

impl ChurnModel {
    /// Read the dataset at `path` and fit the pipeline.
    ///
    /// # Errors
    ///
    /// Any failure here is a startup precondition violation: missing or
    /// empty file, missing columns, null features, a `Churn` value other than
    /// Yes/No, a single class, or a solver failure.
    pub fn train(path: &Path) -> Result<Self, ModelError> {
        let data = TrainingData::from_path(path)?;

        let encoder = FeatureEncoder {
            contract: OneHotEncoder::fit(CONTRACT, data.contract.iter().map(String::as_str)),
            internet_service: OneHotEncoder::fit(
                INTERNET_SERVICE,
                data.internet_service.iter().map(String::as_str),
            ),
        };

        let width = encoder.width();
        let mut flat = Vec::with_capacity(data.len() * width);
        for i in 0..data.len() {
            let row = encoder
                .encode_row(
                    data.tenure[i],
                    &data.contract[i],
                    &data.internet_service[i],
                    data.monthly_charges[i],
                )
                .map_err(|e| ModelError::Load(e.to_string()))?;
            flat.extend(row);
        }

        let records = Array2::from_shape_vec((data.len(), width), flat)
            .map_err(|e| ModelError::Load(e.to_string()))?;
        let rows = data.len();
        let targets = Array1::from_vec(data.churn);
        let dataset = Dataset::new(records, targets);

        let classifier = LogisticRegression::default()
            .alpha(L2_PENALTY)
            .max_iterations(MAX_ITERATIONS)
            .fit(&dataset)
            .map_err(|e| ModelError::Load(format!("logistic regression failed: {}", e)))?;

        info!(
            "Trained churn model on {} rows with {} features",
            rows, width
        );
        debug!("Churn model features: {:?}", encoder.feature_names());

        Ok(Self {
            encoder,
            classifier,
            training_rows: rows,
        })
    }

    /// Probability that the customer described by `request` churns.
    pub fn predict_churn(&self, request: &ChurnRequest) -> Result<f64, PredictionError> {
        request.validate()?;

        let row = self.encoder.encode_row(
            request.tenure,
            &request.contract,
            &request.internet_service,
            request.monthly_charges,
        )?;
        let width = row.len();
        let features = Array2::from_shape_vec((1, width), row)
            .map_err(|e| PredictionError::Inference(e.to_string()))?;

        // linfa reports the probability of whichever class it fitted as positive.
        let probabilities = self.classifier.predict_probabilities(&features);
        let positive = probabilities
            .get(0)
            .copied()
            .ok_or_else(|| PredictionError::Inference("model returned no probability".into()))?;
        let probability = if self.classifier.labels().pos.class == 1 {
            positive
        } else {
            1.0 - positive
        };

        if !probability.is_finite() {
            return Err(PredictionError::Inference(format!(
                "model returned a non-finite probability ({})",
                probability
            )));
        }

        debug!("Churn prediction {:?} -> {:.4}", request, probability);
        Ok(probability.clamp(0.0, 1.0))
    }

    /// Categories learned for a categorical column, if it is one.
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        [&self.encoder.contract, &self.encoder.internet_service]
            .into_iter()
            .find(|e| e.column() == column)
            .map(OneHotEncoder::categories)
    }

    /// Names of the encoded features, in model order.
    pub fn feature_names(&self) -> Vec<String> {
        self.encoder.feature_names()
    }

    /// Number of rows the model was fitted on.
    pub fn training_rows(&self) -> usize {
        self.training_rows
    }
}
