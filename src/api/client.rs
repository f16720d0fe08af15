use crate::api::error::{ApiError, ApiErrorKind};
use crate::config::ApiConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// Ceiling for the `/health` probe, independent of the chat timeout
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Reserved for server-side threading; always sent as `null`
    pub conversation_id: Option<String>,
}

/// Successful body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Answer to one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub conversation_id: Option<String>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub edubot_initialized: bool,
}

impl HealthStatus {
    pub fn is_ready(&self) -> bool {
        self.status == "healthy" && self.edubot_initialized
    }
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
        }
    }
}

impl From<ChatResponse> for Reply {
    fn from(response: ChatResponse) -> Self {
        Self {
            text: response.response,
            conversation_id: response.conversation_id,
        }
    }
}

/// Anything that can answer a question on behalf of the conversation
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Send one question and wait for its answer
    async fn send(&self, text: &str) -> Result<Reply, ApiError>;
}

/// HTTP client for the answering service
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build HTTP client");
                ApiError::configuration()
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }

    /// Probe the service's health endpoint
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let result = self
            .client
            .get(self.health_url())
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => return Err(log_failure("health", ApiError::from_transport(&e), Some(&e))),
        };

        Self::decode(response)
            .await
            .map_err(|err| log_failure("health", err, None))
    }

    /// Read a response, classifying non-2xx statuses and undecodable bodies
    async fn decode<T>(response: reqwest::Response) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, %status, "response body could not be read");
                return Err(ApiError::from_transport(&e));
            }
        };

        if !status.is_success() {
            tracing::debug!(%status, body = %body, "service returned an error status");
            return Err(ApiError::from_status(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(error = %e, "response body is not the expected JSON");
            ApiError::invalid_reply()
        })
    }
}

#[async_trait]
impl ChatService for ApiClient {
    async fn send(&self, text: &str) -> Result<Reply, ApiError> {
        if text.trim().is_empty() {
            return Err(log_failure("chat", ApiError::configuration(), None));
        }

        let request = ChatRequest::new(text);
        tracing::debug!(chars = text.chars().count(), url = %self.chat_url(), "sending chat request");

        let result = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => return Err(log_failure("chat", ApiError::from_transport(&e), Some(&e))),
        };

        let reply: ChatResponse = Self::decode(response)
            .await
            .map_err(|err| log_failure("chat", err, None))?;

        tracing::debug!(chars = reply.response.chars().count(), "chat reply received");
        Ok(reply.into())
    }
}

/// Record a failed call; returns the error unchanged so it can be propagated
fn log_failure(endpoint: &str, err: ApiError, source: Option<&reqwest::Error>) -> ApiError {
    match err.kind {
        ApiErrorKind::InternalServiceError | ApiErrorKind::ConfigurationFailure => {
            tracing::error!(endpoint, kind = err.kind.label(), source = ?source, "{}", err.message);
        }
        _ => {
            tracing::warn!(endpoint, kind = err.kind.label(), source = ?source, "{}", err.message);
        }
    }
    err
}
