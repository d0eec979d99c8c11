//! Chat-completion client.
//!
//! `CompletionService` is the seam the engine calls through; `InferenceClient`
//! implements it over HTTP with `reqwest`. The client is stateless apart from
//! its connection pool, so one instance is shared by every conversation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::config::ChatConfig;
use super::errors::InferenceError;
use super::types::{ChatCompletionRequest, ChatCompletionResponse};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ─── CompletionService ───────────────────────────────────────────────────────

/// A remote chat-completion service.
///
/// Implementations must be safe for concurrent use across conversations.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send one completion request and return the parsed response.
    async fn complete(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, InferenceError>;
}

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// HTTP client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct InferenceClient {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl InferenceClient {
    /// Create a client from the chat configuration.
    ///
    /// Does NOT check connectivity. That happens on the first request.
    pub fn from_config(config: &ChatConfig) -> Result<Self, InferenceError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// The endpoint root requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionService for InferenceClient {
    async fn complete(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, InferenceError> {
        let url = self.completions_url();

        // Metadata only; the body can be huge
        tracing::info!(
            url = %url,
            model = %request.model,
            message_count = request.messages.len(),
            tool_count = request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            n = request.n,
            "completion request"
        );

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout {
                        duration_secs: self.timeout.as_secs(),
                    }
                } else {
                    InferenceError::ConnectionFailed {
                        endpoint: url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| InferenceError::ResponseParse {
                reason: format!("failed to read response body: {e}"),
            })?;

        parse_completion_response(&body_text)
    }
}

/// Parse a non-streaming completion body.
///
/// A response without choices is an error: every caller needs at least the
/// top candidate.
pub fn parse_completion_response(body: &str) -> Result<ChatCompletionResponse, InferenceError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::ResponseParse {
            reason: e.to_string(),
        })?;

    if parsed.choices.is_empty() {
        return Err(InferenceError::EmptyChoices);
    }

    if let Some(usage) = parsed.usage {
        tracing::info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "completion usage"
        );
    }

    Ok(parsed)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
