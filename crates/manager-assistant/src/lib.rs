//! Manager Assistant Library
//!
//! A small business assistant for a single manager, built with Rust, Polars
//! and linfa.
//!
//! # Overview
//!
//! Three components share one process:
//!
//! - **Dataset Summarizer**: per-column descriptive statistics of the
//!   customer CSV, recomputed on every request ([`summary`])
//! - **Churn Predictor**: a one-hot + logistic regression pipeline trained
//!   once at startup ([`churn`])
//! - **Chat Router**: sends each message to the summarizer, the predictor or
//!   a remote LLM ([`router`], [`llm`])
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use manager_assistant::{AssistantConfig, ChatRouter, ChurnModel, ChurnRequest, Conversation};
//! use manager_assistant::llm::{GroqConfig, GroqProvider};
//! use manager_assistant::router::FixedInput;
//! use std::sync::Arc;
//!
//! let config = AssistantConfig::builder().dataset_path("dataset.csv").build()?;
//!
//! // Startup-fatal: a missing dataset or API key aborts here.
//! let model = Arc::new(ChurnModel::train(&config.dataset_path)?);
//! let api_key = config.resolve_api_key()?;
//! let provider = Arc::new(GroqProvider::new(api_key, GroqConfig::from(&config))?);
//!
//! let router = ChatRouter::new(model, provider, &config);
//! let mut conversation = Conversation::with_greeting();
//! let mut form = FixedInput(ChurnRequest::new(2.0, "Month-to-month", "DSL", 85.5));
//!
//! let reply = router.respond(&mut conversation, "Please predict churn", &mut form);
//! println!("{reply}");
//! ```
//!
//! # Error Tiers
//!
//! Training the model, resolving the API key and validating configuration
//! return [`AssistantError`] and are expected to abort startup. Everything
//! per-request (bad prediction inputs, summary IO failures, LLM failures)
//! comes back as a reply string or an `{"error": ...}` payload.

pub mod churn;
pub mod config;
pub mod conversation;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod router;
pub mod summary;

// Re-exports for convenient access
pub use churn::{ChurnModel, ChurnRequest, OneHotEncoder, PredictionOutcome};
pub use config::{AssistantConfig, AssistantConfigBuilder, ConfigValidationError, LlmContext};
pub use conversation::{ChatMessage, Conversation, Role};
pub use error::{
    AssistantError, DatasetReadError, ModelError, PredictionError, Result as AssistantResult,
    SummaryError,
};
pub use router::{ChatRouter, ChurnInputSource, FixedInput, Intent, PromptedInput};
pub use summary::{ColumnStatistics, DatasetSummary, SummaryReport, get_summary, summarize};
