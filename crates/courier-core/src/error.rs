//! Error types for Courier agents

use thiserror::Error;

/// Failures detected inside the routing core.
///
/// None of these escape an agent: the component that detects one converts
/// it into a user-facing reply envelope.
#[derive(Debug, Error)]
pub enum CourierError {
    #[error("Message content is not supported")]
    UnsupportedContent,

    #[error("File {0} not found")]
    NotFound(String),

    #[error("Completion engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Invalid endpoint URL {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("Transport to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Failed to read {reference}: {source}")]
    Io {
        reference: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CourierError>;

impl CourierError {
    pub fn transport(endpoint: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}
