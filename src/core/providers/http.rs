//! HTTP provider backend
//!
//! Forwards a normalized request to an upstream messages endpoint and maps
//! the upstream status codes onto the backend error taxonomy.

use super::{BackendError, BackendResponse, ProviderBackend};
use crate::core::types::{ChatMessage, RequestContext, StopReason};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outgoing upstream request body
#[derive(Debug, Serialize)]
struct UpstreamRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

/// Upstream response body (messages shape)
#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    content: Vec<UpstreamContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: UpstreamUsage,
}

#[derive(Debug, Deserialize)]
struct UpstreamContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamUsage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Provider backend speaking the messages protocol over HTTP
pub struct HttpBackend {
    name: String,
    endpoint: String,
    client: reqwest::Client,
    api_key: Option<String>,
}

impl HttpBackend {
    pub fn new(name: impl Into<String>, base_url: &str, api_key: Option<String>) -> Self {
        let name = name.into();
        Self {
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            client: reqwest::Client::new(),
            api_key,
            name,
        }
    }

    fn server_error(&self, message: impl Into<String>) -> BackendError {
        BackendError::ServerError {
            provider: self.name.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl ProviderBackend for HttpBackend {
    async fn invoke(
        &self,
        native_model: &str,
        ctx: &RequestContext,
    ) -> Result<BackendResponse, BackendError> {
        let body = UpstreamRequest {
            model: native_model,
            messages: &ctx.messages,
            max_tokens: ctx.max_tokens,
            temperature: ctx.temperature,
            stream: ctx.stream,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("x-request-id", ctx.request_id.to_string())
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                BackendError::Timeout {
                    provider: self.name.clone(),
                }
            } else {
                self.server_error(err.to_string())
            }
        })?;

        let status = response.status();
        debug!(provider = %self.name, %status, request_id = %ctx.request_id, "upstream responded");

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok());
            return Err(BackendError::RateLimited {
                provider: self.name.clone(),
                retry_after,
            });
        }

        // 400/422 mean the request itself is defective and would be rejected
        // everywhere; other client errors (auth, model-not-found) can still
        // succeed on a different provider, so they stay recoverable.
        if matches!(status.as_u16(), 400 | 422) {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::BadRequest {
                provider: self.name.clone(),
                message,
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(self.server_error(format!("status {status}: {message}")));
        }

        let parsed: UpstreamResponse = response
            .json()
            .await
            .map_err(|err| self.server_error(format!("malformed response: {err}")))?;

        let text = parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let stop_reason = match parsed.stop_reason.as_deref() {
            Some("max_tokens") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        Ok(BackendResponse {
            text,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
            stop_reason,
        })
    }
}
