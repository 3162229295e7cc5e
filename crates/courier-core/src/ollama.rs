//! Ollama API client with OpenAI-compatible endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{CourierError, Result};
use crate::provider::CompletionClient;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gemma3:12b";

/// Ollama API client using OpenAI-compatible format
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: Url,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("client", &"<reqwest::Client>")
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OllamaClient {
    /// Create a new Ollama API client
    pub fn new(base_url: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = chat_endpoint(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CourierError::EngineUnavailable(format!("HTTP client setup failed: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            max_tokens: 4096,
        })
    }

    /// Set max tokens for responses
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn request_body(&self, system: &str, user_text: &str, temperature: f32) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(system.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(user_text.to_string()),
                },
            ],
            temperature,
            max_tokens: self.max_tokens,
            stream: false,
        }
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        temperature: f32,
    ) -> Result<String> {
        let body = self.request_body(system_prompt, user_text, temperature);

        debug!(
            "Sending completion request to {} (model: {}, {} chars)",
            self.endpoint,
            self.model,
            user_text.len()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CourierError::EngineUnavailable(format!("request to Ollama failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CourierError::EngineUnavailable(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| {
                CourierError::EngineUnavailable(format!("invalid Ollama response: {}", e))
            })?;

        if let Some(usage) = &api_response.usage {
            debug!(
                "Completion used {} prompt / {} completion tokens",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        first_choice_text(api_response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn chat_endpoint(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim_end_matches('/');
    Url::parse(&format!("{}/v1/chat/completions", trimmed)).map_err(|e| {
        CourierError::InvalidEndpoint {
            url: base_url.to_string(),
            reason: e.to_string(),
        }
    })
}

fn first_choice_text(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| CourierError::EngineUnavailable("No text in Ollama response".to_string()))
}

/// Request body for `/v1/chat/completions`
#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

/// Message in conversation history (OpenAI format)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

/// Response from the Ollama API; unknown fields are ignored
#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
