//! Request routing for the orchestrator agent
//!
//! Classifies each incoming message once and dispatches it:
//! - text mentioning a document reference goes to the remote schema agent
//! - any other text is answered locally by the completion engine
//! - non-text content gets a fixed fallback reply

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{CourierError, Result};
use crate::handler::{MessageHandler, RemoteAgent};
use crate::provider::CompletionClient;
use crate::references::{DEFAULT_REFERENCE_MARKERS, mentions_reference};
use crate::types::Message;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

pub const UNSUPPORTED_CONTENT_REPLY: &str =
    "Unsupported message content: only text messages can be handled.";
pub const REMOTE_UNAVAILABLE_REPLY: &str =
    "The schema analyzer agent is unavailable. Please try again later.";
pub const ENGINE_UNAVAILABLE_REPLY: &str =
    "The language model is unavailable. Please try again later.";

/// Where a text message is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answered by the local completion engine
    Local,
    /// Forwarded to the schema-inference agent
    Remote,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Classify a message. Non-text content is `UnsupportedContent`.
pub fn classify<S: AsRef<str>>(message: &Message, markers: &[S]) -> Result<Route> {
    let text = message.text().ok_or(CourierError::UnsupportedContent)?;
    if mentions_reference(text, markers) {
        Ok(Route::Remote)
    } else {
        Ok(Route::Local)
    }
}

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub system_prompt: String,
    pub temperature: f32,
    pub reference_markers: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.1,
            reference_markers: DEFAULT_REFERENCE_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Front-door agent: answers locally or delegates to the schema agent
pub struct Orchestrator {
    completion: Arc<dyn CompletionClient>,
    schema_agent: Arc<dyn RemoteAgent>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        schema_agent: Arc<dyn RemoteAgent>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            completion,
            schema_agent,
            config,
        }
    }

    pub fn classify(&self, message: &Message) -> Result<Route> {
        classify(message, &self.config.reference_markers)
    }

    /// Forward unchanged and relay the peer's reply as-is
    async fn dispatch_remote(&self, message: Message) -> Message {
        let original = message.clone();
        match self.schema_agent.send(message).await {
            Ok(reply) => {
                if !reply.is_reply_to(&original) {
                    warn!(
                        "Reply from {} is not linked to message {} (parent {:?})",
                        self.schema_agent.endpoint(),
                        original.id(),
                        reply.parent_id()
                    );
                }
                info!("Response received from schema analyzer");
                reply
            }
            Err(e) => {
                error!(
                    "Failed to reach schema analyzer at {}: {}",
                    self.schema_agent.endpoint(),
                    e
                );
                Message::agent_reply_text(&original, REMOTE_UNAVAILABLE_REPLY)
            }
        }
    }

    async fn dispatch_local(&self, message: &Message, text: &str) -> Message {
        match self
            .completion
            .complete(&self.config.system_prompt, text, self.config.temperature)
            .await
        {
            Ok(answer) => Message::agent_reply_text(message, answer),
            Err(e) => {
                error!("Local completion with {} failed: {}", self.completion.model(), e);
                Message::agent_reply_text(message, ENGINE_UNAVAILABLE_REPLY)
            }
        }
    }
}

#[async_trait]
impl MessageHandler for Orchestrator {
    async fn handle(&self, message: Message) -> Message {
        info!(
            "Received message {} (conversation {}, sent {})",
            message.id(),
            message.conversation_id(),
            message.timestamp().to_rfc3339()
        );

        match self.classify(&message) {
            Ok(Route::Remote) => {
                info!("Detected JSON reference, forwarding to schema analyzer");
                self.dispatch_remote(message).await
            }
            Ok(Route::Local) => {
                info!("Processing message locally with {}", self.completion.model());
                let text = message.text().unwrap_or_default().to_string();
                debug!("Message content: {}", text);
                self.dispatch_local(&message, &text).await
            }
            Err(e) => {
                warn!("{} ({})", e, message.content().kind());
                Message::agent_reply_text(&message, UNSUPPORTED_CONTENT_REPLY)
            }
        }
    }

    fn name(&self) -> &str {
        "orchestrator"
    }
}
