//! courier-core - routing and schema inference for Courier agents
//!
//! This crate provides:
//! - The message envelope exchanged between agents, with reply linkage
//! - A completion client for Ollama's OpenAI-compatible API
//! - File-reference extraction and all-or-nothing document loading
//! - The schema-inference agent and a rule-based schema inferencer
//! - The orchestrator that routes requests locally or to the schema agent

pub mod error;
pub mod handler;
pub mod inference;
pub mod loader;
pub mod ollama;
pub mod provider;
pub mod references;
pub mod router;
pub mod schema;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use error::{CourierError, Result};
pub use handler::{MessageHandler, RemoteAgent};
pub use inference::RuleInferencer;
pub use loader::{DocumentLoader, FsLoader};
pub use ollama::OllamaClient;
pub use provider::CompletionClient;
pub use references::extract_references;
pub use router::{Orchestrator, OrchestratorConfig, Route, classify};
pub use schema::{Inference, SchemaAgent, SchemaAgentConfig};
pub use types::{Content, Message, Role};
