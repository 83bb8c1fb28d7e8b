//! Inbound request wire format and the normalized request context

use super::message::ChatMessage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inbound messages request (wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    /// Requested model alias (mapped per provider to a native model name)
    pub model: String,
    /// Ordered conversation messages
    pub messages: Vec<ChatMessage>,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Enable streaming
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Normalized request flowing Gateway -> Router -> Provider Backend
///
/// Read-only after construction except for the per-provider model rewrite,
/// which the router performs by passing the native model name alongside the
/// context rather than mutating it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request identifier, threaded through logs and backends
    pub request_id: Uuid,
    /// External model alias as requested by the client
    pub model_alias: String,
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Effective max_tokens after clamping to the gateway ceiling
    pub max_tokens: u32,
    /// Original max_tokens when the gateway clamped it
    pub requested_max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Whether the client asked for streaming
    pub stream: bool,
}

impl RequestContext {
    /// Build a context from a validated wire request.
    ///
    /// `max_tokens` is clamped to `ceiling`; when clamping occurs the original
    /// value is preserved so the gateway can surface it.
    pub fn from_request(request: MessagesRequest, ceiling: u32) -> Self {
        let (max_tokens, requested_max_tokens) = if request.max_tokens > ceiling {
            (ceiling, Some(request.max_tokens))
        } else {
            (request.max_tokens, None)
        };

        Self {
            request_id: Uuid::new_v4(),
            model_alias: request.model,
            messages: request.messages,
            max_tokens,
            requested_max_tokens,
            temperature: request.temperature,
            stream: request.stream.unwrap_or(false),
        }
    }

    /// Rough input token estimate used for scoring before any provider has
    /// reported real usage: four characters per token, floor of 100.
    pub fn estimated_input_tokens(&self) -> u64 {
        let chars: usize = self
            .messages
            .iter()
            .map(|message| message.content.text_len())
            .sum();
        ((chars / 4) as u64).max(100)
    }
}
