//! Groq chat completion provider.
//!
//! This module provides the [`GroqProvider`] which implements the
//! [`ChatProvider`] trait for Groq's OpenAI-compatible API
//! (<https://console.groq.com/docs/api-reference>).

use super::ChatProvider;
use crate::config::AssistantConfig;
use crate::conversation::ChatMessage;
use crate::error::AssistantError;
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Request settings for [`GroqProvider`], taken from [`AssistantConfig`].
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl From<&AssistantConfig> for GroqConfig {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            base_url: config.base_url.clone(),
        }
    }
}

/// Groq chat completion provider.
///
/// # Example
///
/// ```rust,ignore
/// use manager_assistant::llm::{ChatProvider, GroqConfig, GroqProvider};
/// use manager_assistant::{AssistantConfig, ChatMessage};
///
/// let config = AssistantConfig::default();
/// let provider = GroqProvider::new(api_key, GroqConfig::from(&config))?;
/// let reply = provider.complete(&[ChatMessage::user("What is churn?")])?;
/// ```
pub struct GroqProvider {
    api_key: String,
    config: GroqConfig,
    client: Client,
}

impl GroqProvider {
    /// Create a provider with its own blocking HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Provider`] if the HTTP client cannot be
    /// created.
    pub fn new(api_key: impl Into<String>, config: GroqConfig) -> crate::error::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AssistantError::Provider(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    fn build_request<'a>(&'a self, messages: &'a [ChatMessage]) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    fn extract_content(response: CompletionResponse) -> String {
        response
            .choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default()
    }
}

impl ChatProvider for GroqProvider {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(
            "Sending {} messages to {} ({})",
            messages.len(),
            self.config.base_url,
            self.config.model
        );

        let response = self
            .client
            .post(&self.config.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_request(messages))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Groq API Error {}: {}", status, response.text()?));
        }

        let result: CompletionResponse = response.json()?;
        Ok(Self::extract_content(result))
    }

    fn name(&self) -> &str {
        "Groq"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}
