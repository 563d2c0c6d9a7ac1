//! LLM chat completion clients.
//!
//! The router only talks to the [`ChatProvider`] trait. [`GroqProvider`]
//! implements it for Groq's OpenAI-compatible endpoint; any other
//! `/chat/completions` server can be reached by overriding the base URL.
//!
//! # Adding a New Provider
//!
//! 1. Create a new file (e.g., `src/llm/ollama.rs`)
//! 2. Implement the [`ChatProvider`] trait
//! 3. Export the new provider in this module

mod groq;
mod provider;

pub use groq::{GroqConfig, GroqProvider};
pub use provider::ChatProvider;
