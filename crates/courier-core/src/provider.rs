//! Completion engine abstraction shared by the orchestrator and the schema agent

use async_trait::async_trait;

use crate::error::Result;

/// A text-completion engine.
///
/// One call sends a system prompt plus user text and returns the raw model
/// text. Implementations perform no retries and map engine failures to
/// `CourierError::EngineUnavailable`.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_text: &str, temperature: f32)
        -> Result<String>;

    /// Model name, for logging
    fn model(&self) -> &str;
}
