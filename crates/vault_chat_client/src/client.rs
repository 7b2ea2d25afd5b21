//! HTTP client: send a chat message, receive the answer as a token stream
//! (`POST /chat/stream`) or in one piece (`POST /chat/`).

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::StreamExt;
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::messages::{
    ChatRequest, ChatResponse, DashboardSummary, HealthStatus, OrphanedNotes, UntaggedNotes,
};
use crate::stream::{ChatReply, ChatStream, TokenStream};

/// Default API base URL (local uvicorn).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// At most this much of a rejected response body is kept for the error.
const ERROR_BODY_LIMIT: usize = 1024;

/// How long a rejected response may take to deliver that prefix.
const ERROR_BODY_WAIT: Duration = Duration::from_millis(250);

/// Client for the vault organizer chat API.
///
/// ```no_run
/// use futures_util::StreamExt;
/// use vault_chat_client::Client;
///
/// # async fn run() -> Result<(), vault_chat_client::ClientError> {
/// let client = Client::new("http://127.0.0.1:8000");
/// let mut tokens = client.stream("List my notes", None).await?;
/// while let Some(token) = tokens.next().await {
///     print!("{}", token?);
/// }
/// println!("\nthread: {}", tokens.thread_id());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured reqwest client (proxies, TLS roots, headers).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Open a streamed answer. Fails before any token if the request cannot be
    /// sent or the server answers with a non-2xx status.
    ///
    /// `thread_id` continues an existing conversation; the returned stream
    /// reports it (or the server-assigned one) via [`TokenStream::thread_id`].
    pub async fn stream(
        &self,
        message: &str,
        thread_id: Option<&str>,
    ) -> Result<ChatStream, ClientError> {
        let response = self
            .send(self.url("/chat/stream"), message, thread_id)
            .await?;
        tracing::debug!(status = %response.status(), "chat stream opened");
        Ok(TokenStream::new(response.bytes_stream().boxed(), thread_id))
    }

    /// Stream an answer and collect it into a single reply.
    pub async fn query(
        &self,
        message: &str,
        thread_id: Option<&str>,
    ) -> Result<ChatReply, ClientError> {
        self.stream(message, thread_id).await?.into_reply().await
    }

    /// Non-streaming chat: the server runs the agent to completion first.
    pub async fn chat(
        &self,
        message: &str,
        thread_id: Option<&str>,
    ) -> Result<ChatResponse, ClientError> {
        let response = self.send(self.url("/chat/"), message, thread_id).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.get_json("/health", &[]).await
    }

    /// `GET /dashboard/summary` for the vault bound to `thread_id`.
    pub async fn dashboard_summary(
        &self,
        thread_id: &str,
    ) -> Result<DashboardSummary, ClientError> {
        self.get_json("/dashboard/summary", &[("thread_id", thread_id)]).await
    }

    /// Notes with neither incoming nor outgoing links.
    pub async fn dashboard_orphaned(&self, thread_id: &str) -> Result<Vec<String>, ClientError> {
        let notes: OrphanedNotes = self
            .get_json("/dashboard/orphaned", &[("thread_id", thread_id)])
            .await?;
        Ok(notes.orphaned_notes)
    }

    /// Note name → wikilinks pointing at notes that don't exist.
    pub async fn dashboard_broken_links(
        &self,
        thread_id: &str,
    ) -> Result<BTreeMap<String, Vec<String>>, ClientError> {
        self.get_json("/dashboard/broken-links", &[("thread_id", thread_id)]).await
    }

    pub async fn dashboard_untagged(&self, thread_id: &str) -> Result<Vec<String>, ClientError> {
        let notes: UntaggedNotes = self
            .get_json("/dashboard/untagged", &[("thread_id", thread_id)])
            .await?;
        Ok(notes.untagged_notes)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        tracing::debug!(%url, "sending GET request");
        let response = self.http.get(url).query(query).send().await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send(
        &self,
        url: String,
        message: &str,
        thread_id: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        tracing::debug!(%url, thread_id = thread_id.unwrap_or(""), "sending chat request");
        let response = self
            .http
            .post(url)
            .json(&ChatRequest::new(message, thread_id))
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    tracing::warn!(status = status.as_u16(), "request rejected");
    Err(ClientError::Status {
        status: status.as_u16(),
        body: error_body(response).await,
    })
}

/// Best-effort prefix of a rejected body. A server that keeps the body open
/// (an event stream behind a 5xx) must not hold the caller.
async fn error_body(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut chunks = std::pin::pin!(response.bytes_stream());
    let _ = tokio::time::timeout(ERROR_BODY_WAIT, async {
        while body.len() < ERROR_BODY_LIMIT {
            match chunks.next().await {
                Some(Ok(chunk)) => body.extend_from_slice(&chunk),
                _ => break,
            }
        }
    })
    .await;
    body.truncate(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&body).into_owned()
}
