//! Test doubles for the core traits

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{CourierError, Result};
use crate::handler::RemoteAgent;
use crate::loader::DocumentLoader;
use crate::provider::CompletionClient;
use crate::types::{Content, Message, Role};

/// One recorded completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCall {
    pub system_prompt: String,
    pub user_text: String,
    pub temperature: f32,
}

/// Completion client that answers `reply:<user text>` and records every call
#[derive(Default)]
pub struct ScriptedClient {
    pub calls: Mutex<Vec<CompletionCall>>,
    pub fail: bool,
}

impl ScriptedClient {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        temperature: f32,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(CompletionCall {
            system_prompt: system_prompt.to_string(),
            user_text: user_text.to_string(),
            temperature,
        });
        if self.fail {
            return Err(CourierError::EngineUnavailable("connection refused".to_string()));
        }
        Ok(format!("reply:{}", user_text))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// In-memory documents keyed by reference
#[derive(Default)]
pub struct MapLoader {
    files: HashMap<String, String>,
    pub requested: Mutex<Vec<String>>,
}

impl MapLoader {
    pub fn with(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            requested: Mutex::new(vec![]),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentLoader for MapLoader {
    async fn load(&self, reference: &str) -> Result<String> {
        self.requested.lock().unwrap().push(reference.to_string());
        self.files
            .get(reference)
            .cloned()
            .ok_or_else(|| CourierError::NotFound(reference.to_string()))
    }
}

/// Peer agent that records forwarded messages and replies `remote:<text>`
#[derive(Default)]
pub struct RecordingRemote {
    pub received: Mutex<Vec<Message>>,
    pub replies: Mutex<Vec<Message>>,
    pub unreachable: bool,
    /// Reply in a fresh conversation instead of linking to the request
    pub unlinked: bool,
}

impl RecordingRemote {
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn unlinked() -> Self {
        Self {
            unlinked: true,
            ..Default::default()
        }
    }

    pub fn received(&self) -> Vec<Message> {
        self.received.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<Message> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteAgent for RecordingRemote {
    async fn send(&self, message: Message) -> Result<Message> {
        self.received.lock().unwrap().push(message.clone());
        if self.unreachable {
            return Err(CourierError::transport(self.endpoint(), "connection refused"));
        }
        let text = format!("remote:{}", message.text().unwrap_or_default());
        let reply = if self.unlinked {
            Message::new(Content::text(text), Role::Agent)
        } else {
            Message::agent_reply_text(&message, text)
        };
        self.replies.lock().unwrap().push(reply.clone());
        Ok(reply)
    }

    fn endpoint(&self) -> &str {
        "http://schema-agent.test"
    }
}
