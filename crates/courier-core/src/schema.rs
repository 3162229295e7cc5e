//! Schema-inference agent
//!
//! Extracts `.json` references from a text message, loads every referenced
//! document (all or nothing), asks the completion engine for one draft-07
//! schema per document, and answers with the results in reference order.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{CourierError, Result};
use crate::handler::MessageHandler;
use crate::loader::{DocumentLoader, load_all};
use crate::provider::CompletionClient;
use crate::references::extract_references;
use crate::types::Message;

/// Sentinel returned by [`SchemaAgent::infer`] for an empty batch
pub const NO_JSON_INPUT: &str = "error: No JSON input provided.";

pub const NOT_TEXT_REPLY: &str = "Message content is not text.";
pub const NO_FILES_REPLY: &str = "No JSON files found in the message.";
pub const ENGINE_FAILURE_REPLY: &str =
    "Schema inference failed: the completion engine is unavailable.";

pub const SCHEMA_SYSTEM_PROMPT: &str = r#"You are a JSON schema analyzer. You are given a JSON document and must infer its JSON Schema.

Example output for a document with a list of entries and a version number:
{
    "$schema": "http://json-schema.org/draft-07/schema#",
    "type": "object",
    "properties": {
        "entries": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "count": { "type": "integer" },
                    "status": {
                        "type": "object",
                        "properties": {
                            "code": { "type": "integer" },
                            "msg": { "type": "string" }
                        }
                    },
                    "ratio": { "type": "number" }
                }
            }
        },
        "version": { "type": "integer" }
    },
    "required": ["entries", "version"]
}

Rules:
1. Output only a valid JSON object. No explanation, no markdown, no comments.
2. Use only the keys "$schema", "type", "properties", "required" and "items" (with nested "properties"/"required" as needed).
3. A number without a decimal point is "integer". A number with a decimal point is "number". true/false is "boolean". Strings are "string". Objects are "object" with the same rules applied to their fields. Arrays whose elements share one type use "items": {"type": "<child-type>"}. Arrays with mixed element types use "items": {"oneOf": [...]}.
4. The first character of your response must be "{" and the last must be "}". No leading or trailing whitespace.
5. If the input cannot be parsed as JSON, output exactly: { "error": "Invalid JSON: <reason>" }
6. Follow JSON Schema draft-07 syntax exactly. Do not invent keywords."#;

/// Configuration for the schema agent
#[derive(Debug, Clone)]
pub struct SchemaAgentConfig {
    pub system_prompt: String,
    pub temperature: f32,
}

impl Default for SchemaAgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: SCHEMA_SYSTEM_PROMPT.to_string(),
            temperature: 0.1,
        }
    }
}

/// Outcome of a schema inference batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inference {
    /// The batch was empty; answered with [`NO_JSON_INPUT`]
    NoInput,
    /// Raw engine output, one entry per input document, in input order
    Schemas(Vec<String>),
}

/// Agent that turns referenced JSON documents into JSON Schemas
pub struct SchemaAgent {
    completion: Arc<dyn CompletionClient>,
    loader: Arc<dyn DocumentLoader>,
    config: SchemaAgentConfig,
}

impl SchemaAgent {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        loader: Arc<dyn DocumentLoader>,
        config: SchemaAgentConfig,
    ) -> Self {
        Self {
            completion,
            loader,
            config,
        }
    }

    /// Infer one schema per document, in order.
    ///
    /// The engine's text is passed through untouched. Output that is not
    /// valid JSON is logged but still returned.
    pub async fn infer(&self, documents: &[String]) -> Result<Inference> {
        if documents.is_empty() {
            return Ok(Inference::NoInput);
        }

        let mut schemas = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            let raw = self
                .completion
                .complete(&self.config.system_prompt, document, self.config.temperature)
                .await?;
            if serde_json::from_str::<serde_json::Value>(&raw).is_err() {
                warn!(
                    "Model {} returned non-JSON output for document {}",
                    self.completion.model(),
                    index
                );
            }
            schemas.push(raw);
        }
        Ok(Inference::Schemas(schemas))
    }

    async fn analyze(&self, message: &Message, text: &str) -> String {
        let references = extract_references(text);
        info!("Found JSON file references: {:?}", references);

        if references.is_empty() {
            warn!("No JSON file references in message {}", message.id());
            return NO_FILES_REPLY.to_string();
        }

        let documents = match load_all(self.loader.as_ref(), &references).await {
            Ok(documents) => documents,
            Err(CourierError::NotFound(reference)) => {
                error!("File not found: {}", reference);
                return format!("File {} not found.", reference);
            }
            Err(CourierError::Io { reference, source }) => {
                error!("Failed to read {}: {}", reference, source);
                return format!("File {} could not be read.", reference);
            }
            Err(e) => {
                error!("Failed to load documents: {}", e);
                return format!("Referenced files could not be loaded: {}", e);
            }
        };

        match self.infer(&documents).await {
            Ok(Inference::NoInput) => NO_JSON_INPUT.to_string(),
            Ok(Inference::Schemas(schemas)) => {
                info!("Inferred {} schema(s)", schemas.len());
                format_schemas(&references, &schemas)
            }
            Err(e) => {
                error!("Schema inference failed: {}", e);
                ENGINE_FAILURE_REPLY.to_string()
            }
        }
    }
}

/// `JSON Schemas:` followed by one `<reference>:` section per document
fn format_schemas(references: &[String], schemas: &[String]) -> String {
    let mut out = String::from("JSON Schemas:");
    for (reference, schema) in references.iter().zip(schemas) {
        out.push_str("\n\n");
        out.push_str(reference);
        out.push_str(":\n");
        out.push_str(schema);
    }
    out
}

#[async_trait]
impl MessageHandler for SchemaAgent {
    async fn handle(&self, message: Message) -> Message {
        info!(
            "Schema agent received message {} (conversation {}, sent {})",
            message.id(),
            message.conversation_id(),
            message.timestamp().to_rfc3339()
        );

        let reply = match message.text() {
            Some(text) => {
                debug!("Text content: {}", text);
                self.analyze(&message, text).await
            }
            None => {
                warn!("Non-text content received: {}", message.content().kind());
                NOT_TEXT_REPLY.to_string()
            }
        };

        Message::agent_reply_text(&message, reply)
    }

    fn name(&self) -> &str {
        "schema-analyzer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::RuleInferencer;
    use crate::testing::{MapLoader, ScriptedClient};
    use crate::types::{Content, Role};

    fn agent(client: Arc<ScriptedClient>, loader: Arc<MapLoader>) -> SchemaAgent {
        SchemaAgent::new(client, loader, SchemaAgentConfig::default())
    }

    #[tokio::test]
    async fn test_infer_empty_is_sentinel() {
        let client = Arc::new(ScriptedClient::default());
        let agent = agent(client.clone(), Arc::new(MapLoader::default()));

        let inference = agent.infer(&[]).await.unwrap();
        assert_eq!(inference, Inference::NoInput);
        assert_eq!(NO_JSON_INPUT, "error: No JSON input provided.");
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_infer_one_call_per_document_in_order() {
        let client = Arc::new(ScriptedClient::default());
        let agent = agent(client.clone(), Arc::new(MapLoader::default()));

        let docs = vec!["[1]".to_string(), "{}".to_string(), "[1]".to_string()];
        let inference = agent.infer(&docs).await.unwrap();
        assert_eq!(
            inference,
            Inference::Schemas(vec![
                "reply:[1]".to_string(),
                "reply:{}".to_string(),
                "reply:[1]".to_string(),
            ])
        );

        let calls = client.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.system_prompt == SCHEMA_SYSTEM_PROMPT));
        assert!(calls.iter().all(|c| (c.temperature - 0.1).abs() < f32::EPSILON));
    }

    #[tokio::test]
    async fn test_infer_propagates_engine_failure() {
        let agent = agent(Arc::new(ScriptedClient::failing()), Arc::new(MapLoader::default()));
        let err = agent.infer(&["{}".to_string()]).await.unwrap_err();
        assert!(matches!(err, CourierError::EngineUnavailable(_)));
    }

    #[tokio::test]
    async fn test_handle_returns_raw_engine_text() {
        let client = Arc::new(ScriptedClient::default());
        let loader = Arc::new(MapLoader::with(&[("report.json", r#"{"a": 1}"#)]));
        let agent = agent(client.clone(), loader);

        let msg = Message::user_text("Please analyze report.json");
        let reply = agent.handle(msg.clone()).await;

        assert!(reply.is_reply_to(&msg));
        assert_eq!(reply.role(), Role::Agent);
        assert_eq!(
            reply.text().unwrap(),
            "JSON Schemas:\n\nreport.json:\nreply:{\"a\": 1}"
        );
        assert_eq!(client.calls()[0].user_text, r#"{"a": 1}"#);
    }

    #[tokio::test]
    async fn test_handle_missing_file_aborts_batch() {
        let client = Arc::new(ScriptedClient::default());
        let loader = Arc::new(MapLoader::with(&[("a.json", "{}"), ("c.json", "{}")]));
        let agent = agent(client.clone(), loader.clone());

        let msg = Message::user_text("check a.json missing.json c.json");
        let reply = agent.handle(msg.clone()).await;

        assert_eq!(reply.text(), Some("File missing.json not found."));
        assert!(reply.is_reply_to(&msg));
        assert!(client.calls().is_empty());
        assert_eq!(loader.requested(), vec!["a.json", "missing.json"]);
    }

    #[tokio::test]
    async fn test_handle_first_missing_is_named() {
        let agent = agent(Arc::new(ScriptedClient::default()), Arc::new(MapLoader::default()));
        let reply = agent.handle(Message::user_text("x.json y.json")).await;
        assert_eq!(reply.text(), Some("File x.json not found."));
    }

    #[tokio::test]
    async fn test_handle_no_references() {
        let agent = agent(Arc::new(ScriptedClient::default()), Arc::new(MapLoader::default()));
        let reply = agent.handle(Message::user_text("hello there")).await;
        assert_eq!(reply.text(), Some(NO_FILES_REPLY));
    }

    #[tokio::test]
    async fn test_handle_non_text() {
        let agent = agent(Arc::new(ScriptedClient::default()), Arc::new(MapLoader::default()));
        let msg = Message::new(Content::Unsupported, Role::User);
        let reply = agent.handle(msg.clone()).await;
        assert_eq!(reply.text(), Some(NOT_TEXT_REPLY));
        assert!(reply.is_reply_to(&msg));
    }

    #[tokio::test]
    async fn test_handle_engine_failure_is_user_facing() {
        let loader = Arc::new(MapLoader::with(&[("a.json", "{}")]));
        let agent = agent(Arc::new(ScriptedClient::failing()), loader);
        let msg = Message::user_text("a.json");
        let reply = agent.handle(msg.clone()).await;
        assert_eq!(reply.text(), Some(ENGINE_FAILURE_REPLY));
        assert!(reply.is_reply_to(&msg));
    }

    #[tokio::test]
    async fn test_handle_duplicates_processed_twice() {
        let client = Arc::new(ScriptedClient::default());
        let loader = Arc::new(MapLoader::with(&[("a.json", "[]"), ("b.json", "{}")]));
        let agent = agent(client.clone(), loader);

        let reply = agent.handle(Message::user_text("a.json b.json a.json")).await;
        assert_eq!(
            reply.text().unwrap(),
            "JSON Schemas:\n\na.json:\nreply:[]\n\nb.json:\nreply:{}\n\na.json:\nreply:[]"
        );
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_handle_with_rule_inferencer() {
        let loader = Arc::new(MapLoader::with(&[("bad.json", "{oops"), ("good.json", "[1, 2]")]));
        let agent = SchemaAgent::new(
            Arc::new(RuleInferencer::new()),
            loader,
            SchemaAgentConfig::default(),
        );

        let reply = agent.handle(Message::user_text("good.json bad.json")).await;
        let text = reply.text().unwrap();
        assert!(text.contains(r#""items":{"type":"integer"}"#));
        assert!(text.contains("Invalid JSON: "));
    }
}
