//! REST client for the agent workflow backend.
//!
//! Wraps the backend HTTP endpoints (state fetch, chat, identity
//! issuance, agent and tool catalogs) using [`reqwest`].  Every call carries its own timeout;
//! failures come back as [`ApiError`] and are never retried here.

use std::time::Duration;

use async_trait::async_trait;
use flowdeck_core::transcript::FALLBACK_AGENT_REPLY;
use flowdeck_core::{SourceError, StateSource};
use serde::{Deserialize, Serialize};

use crate::catalog::{Agent, AgentMessageRequest, Tool};
use crate::config::ClientConfig;

/// Reply body of `POST /chat`.
///
/// The backend has used both `message` and `content` for the reply text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    pub message: Option<String>,
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChatReply {
    /// The reply text, preferring `message` over `content`.
    pub fn text(&self) -> &str {
        self.message
            .as_deref()
            .or(self.content.as_deref())
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_AGENT_REPLY)
    }
}

/// Reply body of `GET /config/user`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserGrant {
    pub user_id: String,
    pub app_name: String,
}

/// Reply body of `POST /config/session`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionGrant {
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    user_id: &'a str,
    session_id: &'a str,
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    user_id: &'a str,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request did not complete within its timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ApiError {
    fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Request(error)
        }
    }
}

impl From<ApiError> for SourceError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Timeout(after) => SourceError::Timeout(after),
            ApiError::Api { status, body } => SourceError::Status { status, body },
            ApiError::Request(e) => SourceError::Transport(e.to_string()),
        }
    }
}

/// The operations the chat layer needs from the backend.
///
/// Implemented by [`WorkflowApi`]; tests substitute in-memory fakes.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Obtain a fresh user identifier.
    async fn generate_user(&self) -> Result<UserGrant, ApiError>;

    /// Open a new session for `user_id`.
    async fn create_session(&self, user_id: &str) -> Result<SessionGrant, ApiError>;

    /// Send a chat message and wait for the agent's reply.
    async fn send_message(
        &self,
        text: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<ChatReply, ApiError>;
}

/// HTTP client for one backend instance.
#[derive(Clone)]
pub struct WorkflowApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl WorkflowApi {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Fetch the current raw workflow state via `GET /state`.
    ///
    /// A success response whose body is not JSON yields `null`, which the
    /// normalizer turns into an error snapshot.
    pub async fn get_state(&self) -> Result<serde_json::Value, ApiError> {
        let timeout = self.config.state_timeout;
        let response = self
            .client
            .get(self.url("/state"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))?;

        let response = Self::ensure_success(response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))?;

        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "State endpoint returned a non-JSON body");
            serde_json::Value::Null
        }))
    }

    /// List the agents the backend offers via `GET /agents`.
    pub async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        Self::send_json(self.client.get(self.url("/agents")), self.config.state_timeout).await
    }

    /// Fetch one agent via `GET /agents/{id}`.
    pub async fn get_agent(&self, id: &str) -> Result<Agent, ApiError> {
        Self::send_json(
            self.client.get(self.url(&format!("/agents/{id}"))),
            self.config.state_timeout,
        )
        .await
    }

    /// Send `text` directly to an agent, bypassing the chat session.
    ///
    /// Without an `agent_id` the backend routes the message to its
    /// default agent (`POST /agents/message`).
    pub async fn message_agent(
        &self,
        text: &str,
        agent_id: Option<&str>,
    ) -> Result<ChatReply, ApiError> {
        let path = match agent_id {
            Some(id) => format!("/agents/{id}/message"),
            None => "/agents/message".to_string(),
        };
        Self::send_json(
            self.client
                .post(self.url(&path))
                .json(&AgentMessageRequest { message: text }),
            self.config.chat_timeout,
        )
        .await
    }

    /// List the tools the backend offers via `GET /tools`.
    pub async fn list_tools(&self) -> Result<Vec<Tool>, ApiError> {
        Self::send_json(self.client.get(self.url("/tools")), self.config.state_timeout).await
    }

    /// Fetch one tool via `GET /tools/{id}`.
    pub async fn get_tool(&self, id: &str) -> Result<Tool, ApiError> {
        Self::send_json(
            self.client.get(self.url(&format!("/tools/{id}"))),
            self.config.state_timeout,
        )
        .await
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Api`] containing
    /// the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Send a prepared request and parse a successful JSON body.
    async fn send_json<T: serde::de::DeserializeOwned>(
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<T, ApiError> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))?;
        let response = Self::ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout))
    }
}

#[async_trait]
impl AgentBackend for WorkflowApi {
    async fn generate_user(&self) -> Result<UserGrant, ApiError> {
        Self::send_json(
            self.client.get(self.url("/config/user")),
            self.config.state_timeout,
        )
        .await
    }

    async fn create_session(&self, user_id: &str) -> Result<SessionGrant, ApiError> {
        Self::send_json(
            self.client
                .post(self.url("/config/session"))
                .json(&SessionRequest { user_id }),
            self.config.state_timeout,
        )
        .await
    }

    async fn send_message(
        &self,
        text: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<ChatReply, ApiError> {
        let body = ChatRequest {
            message: text,
            user_id,
            session_id,
        };
        let reply: ChatReply = Self::send_json(
            self.client.post(self.url("/chat")).json(&body),
            self.config.chat_timeout,
        )
        .await?;

        tracing::debug!(session_id, reply_len = reply.text().len(), "Chat reply received");
        Ok(reply)
    }
}

#[async_trait]
impl StateSource for WorkflowApi {
    async fn fetch_state(&self) -> Result<serde_json::Value, SourceError> {
        self.get_state().await.map_err(SourceError::from)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use flowdeck_core::{normalize, WorkflowPhase};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;

    #[test]
    fn reply_prefers_message_then_content() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"message":"hi","content":"there"}"#).unwrap();
        assert_eq!(reply.text(), "hi");

        let reply: ChatReply = serde_json::from_str(r#"{"content":"there"}"#).unwrap();
        assert_eq!(reply.text(), "there");
    }

    #[test]
    fn reply_without_text_uses_fallback() {
        let reply: ChatReply = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert_eq!(reply.text(), FALLBACK_AGENT_REPLY);
        assert_eq!(reply.extra["status"], "ok");
    }

    #[test]
    fn api_error_maps_to_source_error() {
        let err = ApiError::Api {
            status: 503,
            body: "busy".into(),
        };
        match SourceError::from(err) {
            SourceError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "busy");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = ApiError::Timeout(Duration::from_secs(3));
        assert!(matches!(
            SourceError::from(err),
            SourceError::Timeout(d) if d == Duration::from_secs(3)
        ));
    }

    #[test]
    fn url_joins_base_and_path() {
        let api = WorkflowApi::new(ClientConfig {
            api_url: "http://backend:9000".into(),
            ..Default::default()
        });
        assert_eq!(api.url("/state"), "http://backend:9000/state");
    }

    // -----------------------------------------------------------------------
    // Local HTTP fixtures
    // -----------------------------------------------------------------------

    fn api_for(addr: std::net::SocketAddr, timeout: Duration) -> WorkflowApi {
        WorkflowApi::new(ClientConfig {
            api_url: format!("http://{addr}"),
            state_timeout: timeout,
            chat_timeout: timeout,
        })
    }

    /// Read one HTTP request: headers plus a `content-length` body.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    /// Serve one request with a canned response; resolves to the raw
    /// request text.
    async fn serve_once(
        status: &str,
        content_type: &str,
        body: &str,
    ) -> (std::net::SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            request
        });
        (addr, task)
    }

    /// Accept connections and never answer.
    async fn silent_backend() -> (std::net::SocketAddr, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        (addr, task)
    }

    fn request_body(request: &str) -> serde_json::Value {
        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    // -----------------------------------------------------------------------
    // Test: HTTP contracts
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn silent_backend_hits_the_per_call_timeout() {
        let (addr, server) = silent_backend().await;
        let timeout = Duration::from_millis(200);
        let api = api_for(addr, timeout);

        let started = std::time::Instant::now();
        let err = api.get_state().await.unwrap_err();
        assert_matches!(err, ApiError::Timeout(d) if d == timeout);
        assert!(started.elapsed() < Duration::from_secs(5));

        let err = api.fetch_state().await.unwrap_err();
        assert_matches!(err, SourceError::Timeout(d) if d == timeout);
        server.abort();
    }

    #[tokio::test]
    async fn non_json_state_body_becomes_error_snapshot() {
        let (addr, server) = serve_once("200 OK", "text/plain", "backend warming up").await;
        let api = api_for(addr, Duration::from_secs(5));

        let raw = api.get_state().await.unwrap();
        assert_eq!(raw, serde_json::Value::Null);
        assert_eq!(normalize(&raw).phase(), WorkflowPhase::Error);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /state "), "{request}");
    }

    #[tokio::test]
    async fn chat_posts_message_and_identity() {
        let (addr, server) =
            serve_once("200 OK", "application/json", r#"{"message":"hello back"}"#).await;
        let api = api_for(addr, Duration::from_secs(5));

        let reply = api.send_message("hi there", "u-1", "s-1").await.unwrap();
        assert_eq!(reply.text(), "hello back");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /chat "), "{request}");
        assert_eq!(
            request_body(&request),
            json!({ "message": "hi there", "user_id": "u-1", "session_id": "s-1" })
        );
    }

    #[tokio::test]
    async fn non_success_status_keeps_body() {
        let (addr, server) = serve_once("404 Not Found", "text/plain", "no such tool").await;
        let api = api_for(addr, Duration::from_secs(5));

        let err = api.get_tool("t-9").await.unwrap_err();
        assert_matches!(err, ApiError::Api { status: 404, ref body } if body == "no such tool");
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /tools/t-9 "), "{request}");
    }

    #[tokio::test]
    async fn agent_catalog_lists_agents() {
        let (addr, server) = serve_once(
            "200 OK",
            "application/json",
            r#"[{"id":"a1","name":"Planner","description":"plans","type":"llm","config":{}}]"#,
        )
        .await;
        let api = api_for(addr, Duration::from_secs(5));

        let agents = api.list_agents().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, "Planner");
        assert_eq!(agents[0].kind, "llm");
        assert!(server.await.unwrap().starts_with("GET /agents "));
    }

    #[tokio::test]
    async fn agent_message_routes_by_id() {
        let (addr, server) =
            serve_once("200 OK", "application/json", r#"{"content":"on it"}"#).await;
        let api = api_for(addr, Duration::from_secs(5));

        let reply = api.message_agent("summarize", Some("a1")).await.unwrap();
        assert_eq!(reply.text(), "on it");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /agents/a1/message "), "{request}");
        assert_eq!(request_body(&request), json!({ "message": "summarize" }));
    }

    #[tokio::test]
    async fn agent_message_without_id_uses_default_agent() {
        let (addr, server) = serve_once("200 OK", "application/json", "{}").await;
        let api = api_for(addr, Duration::from_secs(5));

        let reply = api.message_agent("hello", None).await.unwrap();
        assert_eq!(reply.text(), FALLBACK_AGENT_REPLY);
        assert!(server.await.unwrap().starts_with("POST /agents/message "));
    }
}
