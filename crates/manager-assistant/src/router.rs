//! Chat router.
//!
//! Every user message goes through [`ChatRouter::route`], which picks one of
//! three branches from trigger phrases in the lowercased text:
//!
//! | Priority | Trigger phrases | Branch |
//! |----------|-----------------|--------|
//! | 1 | `predict churn`, `churn prediction` | churn model |
//! | 2 | `summary`, `summarise`, `summarize`, `analyze dataset` | dataset summary |
//! | 3 | anything else | LLM chat completion |
//!
//! The router never fails. Branch errors become
//! `"Sorry, an error occurred while <doing X>: <message>"`.
//!
//! How the churn branch obtains its four input fields is a strategy
//! ([`ChurnInputSource`]): the CLI prompts for them line by line, a form
//! front end hands over whatever was last submitted.

use crate::churn::{ChurnModel, ChurnRequest};
use crate::config::{AssistantConfig, LlmContext};
use crate::conversation::{ChatMessage, Conversation, Role};
use crate::llm::ChatProvider;
use crate::summary::summarize;
use anyhow::{Context, Result, anyhow};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Prefix of every summary reply.
pub const SUMMARY_PREFIX: &str = "Here is the statistical summary of the dataset:";

const PREDICT_TRIGGERS: [&str; 2] = ["predict churn", "churn prediction"];
const SUMMARY_TRIGGERS: [&str; 4] = ["summary", "summarise", "summarize", "analyze dataset"];

/// Which branch a message is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    PredictChurn,
    Summarize,
    Chat,
}

impl Intent {
    /// Classify a message; the first matching trigger group wins.
    pub fn detect(message: &str) -> Self {
        let text = message.to_lowercase();
        if PREDICT_TRIGGERS.iter().any(|t| text.contains(t)) {
            Intent::PredictChurn
        } else if SUMMARY_TRIGGERS.iter().any(|t| text.contains(t)) {
            Intent::Summarize
        } else {
            Intent::Chat
        }
    }
}

/// Strategy for collecting the fields of a churn prediction.
pub trait ChurnInputSource {
    fn collect(&mut self) -> Result<ChurnRequest>;
}

/// Uses a fixed set of values, e.g. the last submitted form.
#[derive(Debug, Clone)]
pub struct FixedInput(pub ChurnRequest);

impl ChurnInputSource for FixedInput {
    fn collect(&mut self) -> Result<ChurnRequest> {
        Ok(self.0.clone())
    }
}

/// Asks for each field in turn on a line-oriented terminal.
pub struct PromptedInput<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> PromptedInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.writer, "{}", prompt)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(anyhow!("input ended before all fields were entered"));
        }
        Ok(line.trim().to_string())
    }

    fn ask_number(&mut self, prompt: &str) -> Result<f64> {
        let answer = self.ask(prompt)?;
        answer
            .parse::<f64>()
            .with_context(|| format!("could not convert string to float: '{}'", answer))
    }
}

impl<R: BufRead, W: Write> ChurnInputSource for PromptedInput<R, W> {
    fn collect(&mut self) -> Result<ChurnRequest> {
        let tenure = self.ask_number("Bot: Enter tenure in months: ")?;
        let contract = self.ask("Bot: Enter contract (Month-to-month / One year / Two year): ")?;
        let internet = self.ask("Bot: Enter internet type (DSL / Fiber optic): ")?;
        let monthly = self.ask_number("Bot: Enter monthly charges: ")?;
        Ok(ChurnRequest::new(tenure, contract, internet, monthly))
    }
}

/// Dispatches messages to the churn model, the summarizer or the LLM.
pub struct ChatRouter {
    model: Arc<ChurnModel>,
    provider: Arc<dyn ChatProvider>,
    dataset_path: PathBuf,
    llm_context: LlmContext,
    system_prompt: String,
}

impl ChatRouter {
    pub fn new(
        model: Arc<ChurnModel>,
        provider: Arc<dyn ChatProvider>,
        config: &AssistantConfig,
    ) -> Self {
        Self {
            model,
            provider,
            dataset_path: config.dataset_path.clone(),
            llm_context: config.llm_context,
            system_prompt: config.system_prompt.clone(),
        }
    }

    /// Answer `message`.
    ///
    /// `history` is the conversation so far; if its last entry is not this
    /// user message, the message is appended when the full history is sent.
    pub fn route(
        &self,
        message: &str,
        history: &[ChatMessage],
        inputs: &mut dyn ChurnInputSource,
    ) -> String {
        let intent = Intent::detect(message);
        info!("Routing message as {:?}", intent);

        match intent {
            Intent::PredictChurn => self.handle_predict_churn(inputs),
            Intent::Summarize => self.handle_summary(),
            Intent::Chat => self.handle_chat(message, history),
        }
    }

    /// Record the user message, answer it and record the reply.
    pub fn respond(
        &self,
        conversation: &mut Conversation,
        message: &str,
        inputs: &mut dyn ChurnInputSource,
    ) -> String {
        conversation.push_user(message);
        let reply = self.route(message, conversation.messages(), inputs);
        conversation.push_assistant(reply.clone());
        reply
    }

    fn handle_predict_churn(&self, inputs: &mut dyn ChurnInputSource) -> String {
        let result = inputs.collect().and_then(|request| {
            self.model
                .predict_churn(&request)
                .map_err(anyhow::Error::from)
        });

        match result {
            Ok(probability) => format!(
                "Based on the model, the churn probability is about {:.2}%.",
                probability * 100.0
            ),
            Err(e) => {
                warn!("Churn prediction failed: {:#}", e);
                format!("Sorry, an error occurred while predicting churn: {:#}", e)
            }
        }
    }

    fn handle_summary(&self) -> String {
        let result = summarize(&self.dataset_path)
            .map_err(anyhow::Error::from)
            .and_then(|summary| {
                serde_json::to_string_pretty(&summary).map_err(anyhow::Error::from)
            });

        match result {
            Ok(json) => format!("{}\n{}", SUMMARY_PREFIX, json),
            Err(e) => {
                warn!("Dataset summary failed: {:#}", e);
                format!(
                    "Sorry, an error occurred while summarizing the dataset: {:#}",
                    e
                )
            }
        }
    }

    fn handle_chat(&self, message: &str, history: &[ChatMessage]) -> String {
        let messages = self.llm_messages(message, history);

        match self.provider.complete(&messages) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("{} completion failed: {:#}", self.provider.name(), e);
                format!(
                    "Sorry, an error occurred while calling {} API: {:#}",
                    self.provider.name(),
                    e
                )
            }
        }
    }

    fn llm_messages(&self, message: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.system_prompt.clone())];

        match self.llm_context {
            LlmContext::CurrentMessage => messages.push(ChatMessage::user(message)),
            LlmContext::FullHistory => {
                messages.extend(history.iter().cloned());
                let ends_with_message = history
                    .last()
                    .is_some_and(|m| m.role == Role::User && m.content == message);
                if !ends_with_message {
                    messages.push(ChatMessage::user(message));
                }
            }
        }

        messages
    }
}
