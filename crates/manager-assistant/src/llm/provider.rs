//! Chat provider trait for abstracting LLM interactions.

use crate::conversation::ChatMessage;
use anyhow::Result;

/// Trait for LLM providers that can answer a chat conversation.
///
/// Calls are synchronous and single-shot: one request, one complete reply,
/// no streaming and no retry. Callers are expected to catch errors and
/// report them as text.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage across threads.
pub trait ChatProvider: Send + Sync {
    /// Send `messages` in order and return the assistant's reply text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails (network, authentication,
    /// rate limiting) or the response cannot be parsed.
    fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Get the provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Get the model being used by this provider.
    fn model(&self) -> Option<&str> {
        None
    }
}
