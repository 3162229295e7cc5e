//! courier-a2a - Agent-to-Agent HTTP transport
//!
//! Serves any `MessageHandler` over HTTP and provides the matching client,
//! which plugs into the orchestrator as its `RemoteAgent`.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::A2aClient;
pub use protocol::{AgentCard, AuthConfig, ErrorBody, StatusResponse};
pub use server::A2aServer;
