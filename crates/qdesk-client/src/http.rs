//! HTTP implementation of the queue service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info};

use qdesk_core::{Error, QueueService, QueueState, Result, Scope, TicketView};

/// Default queue-service base URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// REST-backed [`QueueService`].
///
/// `fetch_state` is a plain idempotent GET, cheap enough for every poll
/// tick. Mutating actions map the server's explicit "none available"
/// responses (204, or 404 on a ticket path) to `Ok(None)`.
pub struct HttpQueueService {
    client: Client,
    base_url: String,
}

impl HttpQueueService {
    /// Create a client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let timeout = std::env::var("QDESK_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        let base_url = base_url.into();
        info!(base_url = %base_url, timeout_secs = timeout, "queue service client initialized");
        Ok(Self { client, base_url })
    }

    /// Create a client from `QDESK_API_URL` (with default).
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("QDESK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(base_url)
    }

    fn scope_path(scope: Scope) -> String {
        match scope {
            Scope::Window(id) => format!("windows/{id}"),
            Scope::Department(id) => format!("departments/{id}"),
        }
    }

    /// Decode a mutating-action response, mapping explicit "none
    /// available" outcomes to `Ok(None)`.
    async fn maybe_ticket(response: Response) -> Result<Option<TicketView>> {
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<TicketView>().await?)),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Request(format!("queue action failed: {status}: {body}")))
            }
        }
    }

    async fn ticket_action(&self, ticket_id: &str, action: &str) -> Result<Option<TicketView>> {
        let url = format!("{}/api/tickets/{ticket_id}/{action}", self.base_url);
        debug!(ticket_id, action, "ticket action");
        let response = self.client.post(&url).send().await?;
        Self::maybe_ticket(response).await
    }
}

#[async_trait]
impl QueueService for HttpQueueService {
    async fn fetch_state(&self, scope: Scope) -> Result<QueueState> {
        let url = format!("{}/api/{}/state", self.base_url, Self::scope_path(scope));
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Request(format!(
                "state fetch failed: {}",
                response.status()
            )));
        }
        Ok(response.json::<QueueState>().await?)
    }

    async fn call_next(&self, scope: Scope) -> Result<Option<TicketView>> {
        let url = format!("{}/api/{}/call-next", self.base_url, Self::scope_path(scope));
        let response = self.client.post(&url).send().await?;
        Self::maybe_ticket(response).await
    }

    async fn mark_served(&self, ticket_id: &str) -> Result<Option<TicketView>> {
        self.ticket_action(ticket_id, "served").await
    }

    async fn hold(&self, ticket_id: &str) -> Result<Option<TicketView>> {
        self.ticket_action(ticket_id, "hold").await
    }

    async fn mark_out(&self, ticket_id: &str) -> Result<Option<TicketView>> {
        self.ticket_action(ticket_id, "out").await
    }

    async fn return_from_hold(&self, ticket_id: &str) -> Result<Option<TicketView>> {
        self.ticket_action(ticket_id, "return").await
    }
}
