//! A2A wire protocol: agent card, status, and error bodies.
//!
//! Messages themselves travel as `courier_core::Message` JSON.

use serde::{Deserialize, Serialize};

pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";
pub const MESSAGES_PATH: &str = "/a2a/messages";
pub const STATUS_PATH: &str = "/status";

/// Self-description an agent publishes for discovery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub authentication: AuthConfig,
}

impl AgentCard {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            capabilities: vec![],
            authentication: AuthConfig::default(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn with_bearer_auth(mut self) -> Self {
        self.authentication.schemes = vec!["bearer".to_string()];
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    pub schemes: Vec<String>,
}

/// Body of `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub agent: String,
    pub uptime_secs: u64,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_card_json() {
        let card = AgentCard::new(
            "schema-analyzer",
            "Infers JSON schemas",
            "http://localhost:8002",
        )
        .with_capability("json_schema_inference")
        .with_bearer_auth();
        let json = serde_json::to_string_pretty(&card).unwrap();
        assert!(json.contains("schema-analyzer"));
        assert!(json.contains("json_schema_inference"));
        assert!(json.contains("bearer"));
    }

    #[test]
    fn test_agent_card_defaults() {
        let json = r#"{"name":"peer","description":"d","url":"http://x","version":"1.0.0"}"#;
        let card: AgentCard = serde_json::from_str(json).unwrap();
        assert!(card.capabilities.is_empty());
        assert!(card.authentication.schemes.is_empty());
    }

    #[test]
    fn test_error_body() {
        let json = serde_json::to_string(&ErrorBody::new("unauthorized")).unwrap();
        assert_eq!(json, r#"{"error":"unauthorized"}"#);
    }
}
