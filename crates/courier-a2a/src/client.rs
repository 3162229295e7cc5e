//! A2A client — sends messages to a peer agent over HTTP

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;

use courier_core::error::{CourierError, Result};
use courier_core::handler::RemoteAgent;
use courier_core::types::Message;

use crate::protocol::{AGENT_CARD_PATH, AgentCard, ErrorBody, MESSAGES_PATH};

/// HTTP client for one peer agent
#[derive(Clone)]
pub struct A2aClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for A2aClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("A2aClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl A2aClient {
    /// `timeout` bounds each whole request, including the peer's processing time
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| CourierError::InvalidEndpoint {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CourierError::transport(&base_url, e))?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>`; an empty token disables auth
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let reason = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "no error body".to_string(),
        };
        Err(CourierError::transport(
            &self.base_url,
            format!("status {}: {}", status, reason),
        ))
    }

    /// Fetch the peer's agent card
    pub async fn fetch_card(&self) -> Result<AgentCard> {
        let response = self
            .client
            .get(self.url(AGENT_CARD_PATH))
            .send()
            .await
            .map_err(|e| CourierError::transport(&self.base_url, e))?;
        self.check(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                CourierError::transport(&self.base_url, format!("invalid agent card: {}", e))
            })
    }
}

#[async_trait]
impl RemoteAgent for A2aClient {
    async fn send(&self, message: Message) -> Result<Message> {
        debug!("Sending message {} to {}", message.id(), self.base_url);

        let request = self.client.post(self.url(MESSAGES_PATH)).json(&message);
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| CourierError::transport(&self.base_url, e))?;

        self.check(response)
            .await?
            .json::<Message>()
            .await
            .map_err(|e| CourierError::transport(&self.base_url, format!("invalid reply: {}", e)))
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}
