//! Configuration types for the manager assistant.
//!
//! [`AssistantConfig`] is built once at startup with a builder and handed to
//! the router and the LLM provider. Nothing here is read lazily.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default dataset location, relative to the working directory.
pub const DEFAULT_DATASET_PATH: &str = "dataset.csv";

/// Environment variable holding the LLM API key.
pub const DEFAULT_API_KEY_VAR: &str = "GROQ_API_KEY";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Default OpenAI-compatible chat completion endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default timeout for a single completion request in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// System prompt sent ahead of every LLM conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI assistant for a manager. \
    You can chat in English, explain business concepts, \
    and help with management decisions.";

/// How much of the conversation is forwarded to the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LlmContext {
    /// Only the system prompt and the message being answered.
    CurrentMessage,
    /// The system prompt followed by the whole conversation so far.
    #[default]
    FullHistory,
}

/// Configuration for the assistant.
///
/// # Example
///
/// ```rust,ignore
/// use manager_assistant::config::{AssistantConfig, LlmContext};
///
/// let config = AssistantConfig::builder()
///     .dataset_path("data/dataset.csv")
///     .llm_context(LlmContext::CurrentMessage)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// CSV file used by both the summarizer and the churn model.
    /// Default: "dataset.csv"
    pub dataset_path: PathBuf,

    /// Chat model identifier sent to the LLM endpoint.
    /// Default: "llama-3.3-70b-versatile"
    pub model: String,

    /// Chat completion endpoint.
    pub base_url: String,

    /// Request timeout in seconds.
    /// Default: 60
    pub timeout_secs: u64,

    /// Environment variable the API key is read from.
    /// Default: "GROQ_API_KEY"
    pub api_key_var: String,

    /// Conversation context forwarded to the LLM.
    /// Default: FullHistory
    pub llm_context: LlmContext,

    /// System prompt prepended to every LLM request.
    pub system_prompt: String,

    /// Sampling temperature (0.0 - 2.0); omitted from requests when unset.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Cap on completion tokens; omitted from requests when unset.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key_var: DEFAULT_API_KEY_VAR.to_string(),
            llm_context: LlmContext::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl AssistantConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AssistantConfigBuilder {
        AssistantConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.dataset_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyField("dataset_path".to_string()));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("model".to_string()));
        }

        if self.api_key_var.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("api_key_var".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigValidationError::InvalidBaseUrl(self.base_url.clone()));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout(self.timeout_secs));
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigValidationError::InvalidTemperature(temperature));
            }
        }

        if self.max_tokens == Some(0) {
            return Err(ConfigValidationError::InvalidMaxTokens);
        }

        Ok(())
    }

    /// Read the API key from the environment.
    ///
    /// A missing or blank value is a startup-fatal error.
    pub fn resolve_api_key(&self) -> crate::error::Result<String> {
        match std::env::var(&self.api_key_var) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(crate::error::AssistantError::MissingApiKey(
                self.api_key_var.clone(),
            )),
        }
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("'{0}' must not be empty")]
    EmptyField(String),

    #[error("Invalid base URL: {0} (must start with http:// or https://)")]
    InvalidBaseUrl(String),

    #[error("Invalid timeout: {0} (must be at least 1 second)")]
    InvalidTimeout(u64),

    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),

    #[error("Invalid max_tokens: must be at least 1")]
    InvalidMaxTokens,
}

/// Builder for [`AssistantConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AssistantConfigBuilder {
    dataset_path: Option<PathBuf>,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    api_key_var: Option<String>,
    llm_context: Option<LlmContext>,
    system_prompt: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl AssistantConfigBuilder {
    /// Set the dataset CSV path.
    pub fn dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_path = Some(path.into());
        self
    }

    /// Set the chat model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set a custom chat completion endpoint.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout in seconds.
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    /// Set the environment variable holding the API key.
    pub fn api_key_var(mut self, var: impl Into<String>) -> Self {
        self.api_key_var = Some(var.into());
        self
    }

    /// Set how much conversation context reaches the LLM.
    pub fn llm_context(mut self, context: LlmContext) -> Self {
        self.llm_context = Some(context);
        self
    }

    /// Override the system prompt.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token cap.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AssistantConfig` or an error if validation fails.
    pub fn build(self) -> Result<AssistantConfig, ConfigValidationError> {
        let config = AssistantConfig {
            dataset_path: self
                .dataset_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH)),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            api_key_var: self
                .api_key_var
                .unwrap_or_else(|| DEFAULT_API_KEY_VAR.to_string()),
            llm_context: self.llm_context.unwrap_or_default(),
            system_prompt: self
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        config.validate()?;
        Ok(config)
    }
}
