//! A2A server — exposes one agent to its peers over HTTP
//!
//! Exposes endpoints:
//! - GET  /.well-known/agent.json  — Agent card
//! - POST /a2a/messages            — Send a message, receive the reply
//! - GET  /status                  — Liveness and uptime

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Json;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use courier_core::handler::MessageHandler;
use courier_core::types::Message;

use crate::protocol::{
    AGENT_CARD_PATH, AgentCard, ErrorBody, MESSAGES_PATH, STATUS_PATH, StatusResponse,
};

/// Maximum request body size (1MB) to prevent OOM DoS
const MAX_REQUEST_BODY_SIZE: usize = 1_048_576;

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Clone)]
struct ServerState {
    handler: Arc<dyn MessageHandler>,
    card: Arc<AgentCard>,
    auth_token: Option<Arc<str>>,
    start_time: Instant,
}

/// A2A server state
pub struct A2aServer {
    state: ServerState,
}

impl A2aServer {
    /// An empty or absent `auth_token` leaves the message endpoint open
    pub fn new(
        handler: Arc<dyn MessageHandler>,
        card: AgentCard,
        auth_token: Option<String>,
    ) -> Self {
        let auth_token = auth_token.filter(|t| !t.is_empty()).map(Arc::from);
        Self {
            state: ServerState {
                handler,
                card: Arc::new(card),
                auth_token,
                start_time: Instant::now(),
            },
        }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route(AGENT_CARD_PATH, get(card_handler))
            .route(STATUS_PATH, get(status_handler))
            .route(MESSAGES_PATH, post(message_handler))
            .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind `host:port` and serve until `shutdown` resolves
    pub async fn serve<F>(self, host: &str, port: u16, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", host, port))?;
        self.serve_with_listener(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve_with_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!("A2A server for {} listening on {}", self.state.card.name, addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("A2A server for {} stopped", self.state.card.name);
        Ok(())
    }
}

// ── HTTP Handlers ──

async fn card_handler(State(state): State<ServerState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

async fn status_handler(State(state): State<ServerState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        agent: state.handler.name().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn message_handler(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<Message>, ApiError> {
    if let Some(expected) = &state.auth_token {
        if !check_auth(expected, &headers) {
            warn!("Rejected unauthorized A2A message");
            return Err(api_error(StatusCode::UNAUTHORIZED, "unauthorized"));
        }
    }

    let message: Message = serde_json::from_slice(&body).map_err(|e| {
        api_error(StatusCode::BAD_REQUEST, format!("invalid message: {}", e))
    })?;

    Ok(Json(state.handler.handle(message).await))
}

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody::new(error)))
}

/// Constant-time bearer token comparison
fn check_auth(expected: &str, headers: &HeaderMap) -> bool {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let Some(provided) = auth.strip_prefix("Bearer ") else {
        return false;
    };
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    provided.len() == expected.len()
        && provided
            .iter()
            .zip(expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::A2aClient;
    use async_trait::async_trait;
    use courier_core::error::CourierError;
    use courier_core::handler::RemoteAgent;
    use courier_core::provider::CompletionClient;
    use courier_core::types::{Content, Role};
    use courier_core::{
        FsLoader, Orchestrator, OrchestratorConfig, RuleInferencer, SchemaAgent,
        SchemaAgentConfig,
    };
    use std::time::Duration;

    /// Local engine stand-in that echoes the user text
    struct EchoEngine;

    #[async_trait]
    impl CompletionClient for EchoEngine {
        async fn complete(
            &self,
            _system: &str,
            user_text: &str,
            _t: f32,
        ) -> courier_core::Result<String> {
            Ok(format!("echo:{}", user_text))
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    async fn spawn(handler: Arc<dyn MessageHandler>, token: Option<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let card = AgentCard::new(handler.name(), "test agent", url.clone());
        let server = A2aServer::new(handler, card, token);
        tokio::spawn(server.serve_with_listener(listener, std::future::pending()));
        url
    }

    fn schema_agent(dir: &std::path::Path) -> Arc<SchemaAgent> {
        Arc::new(SchemaAgent::new(
            Arc::new(RuleInferencer::new()),
            Arc::new(FsLoader::new().with_base_dir(dir)),
            SchemaAgentConfig::default(),
        ))
    }

    fn client(url: &str) -> A2aClient {
        A2aClient::new(url, Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_check_auth() {
        let mut headers = HeaderMap::new();
        assert!(!check_auth("secret", &headers));
        headers.insert(header::AUTHORIZATION, "Bearer secret".parse().unwrap());
        assert!(check_auth("secret", &headers));
        headers.insert(header::AUTHORIZATION, "Bearer secreT".parse().unwrap());
        assert!(!check_auth("secret", &headers));
        headers.insert(header::AUTHORIZATION, "Basic secret".parse().unwrap());
        assert!(!check_auth("secret", &headers));
    }

    #[tokio::test]
    async fn test_agent_card_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn(schema_agent(dir.path()), None).await;

        let card = client(&url).fetch_card().await.unwrap();
        assert_eq!(card.name, "schema-analyzer");
        assert_eq!(card.url, url);
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn(schema_agent(dir.path()), None).await;

        let status: StatusResponse = reqwest::get(format!("{}{}", url, STATUS_PATH))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status.status, "ok");
        assert_eq!(status.agent, "schema-analyzer");
    }

    #[tokio::test]
    async fn test_schema_agent_over_http() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.json"), r#"{"a": 1}"#).unwrap();
        let url = spawn(schema_agent(dir.path()), None).await;

        let msg = Message::user_text("Please analyze report.json");
        let reply = client(&url).send(msg.clone()).await.unwrap();

        assert!(reply.is_reply_to(&msg));
        let text = reply.text().unwrap();
        assert!(text.starts_with("JSON Schemas:"));
        assert!(text.contains(r#""a":{"type":"integer"}"#));
    }

    #[tokio::test]
    async fn test_two_hop_chain_preserves_linkage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.json"), r#"{"a": 1}"#).unwrap();
        let schema_url = spawn(schema_agent(dir.path()), None).await;

        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(EchoEngine),
            Arc::new(client(&schema_url)),
            OrchestratorConfig::default(),
        ));
        let orch_url = spawn(orchestrator, None).await;
        let front = client(&orch_url);

        let msg = Message::user_text("Please analyze report.json");
        let reply = front.send(msg.clone()).await.unwrap();
        assert_eq!(reply.parent_id(), Some(msg.id()));
        assert_eq!(reply.conversation_id(), msg.conversation_id());
        assert!(reply.text().unwrap().contains("report.json:"));

        let missing = Message::user_text("Please analyze missing.json");
        let reply = front.send(missing.clone()).await.unwrap();
        assert_eq!(reply.text(), Some("File missing.json not found."));
        assert!(reply.is_reply_to(&missing));

        let hello = Message::user_text("hello there");
        let reply = front.send(hello.clone()).await.unwrap();
        assert_eq!(reply.text(), Some("echo:hello there"));
        assert!(reply.is_reply_to(&hello));

        let other = Message::new(Content::Unsupported, Role::User);
        let reply = front.send(other.clone()).await.unwrap();
        assert_eq!(
            reply.text(),
            Some(courier_core::router::UNSUPPORTED_CONTENT_REPLY)
        );
    }

    #[tokio::test]
    async fn test_auth_required() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn(schema_agent(dir.path()), Some("a2a-token".to_string())).await;

        let err = client(&url)
            .send(Message::user_text("x.json"))
            .await
            .unwrap_err();
        match err {
            CourierError::Transport { reason, .. } => {
                assert!(reason.contains("401"));
                assert!(reason.contains("unauthorized"));
            }
            other => panic!("expected transport error, got {:?}", other),
        }

        let reply = client(&url)
            .with_token("a2a-token")
            .send(Message::user_text("x.json"))
            .await
            .unwrap();
        assert_eq!(reply.text(), Some("File x.json not found."));
    }

    #[tokio::test]
    async fn test_invalid_body_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let url = spawn(schema_agent(dir.path()), None).await;

        let response = reqwest::Client::new()
            .post(format!("{}{}", url, MESSAGES_PATH))
            .body("not a message")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: ErrorBody = response.json().await.unwrap();
        assert!(body.error.starts_with("invalid message"));
    }
}
