//! Outbound response wire format

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalized stop reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
}

/// Token usage for a single completion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// A response content block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
}

/// Outbound messages response (wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    /// Synthesized response identifier
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Always "assistant"
    pub role: String,
    /// Response content blocks
    pub content: Vec<ContentBlock>,
    /// Native model that actually produced the completion
    pub model: String,
    /// Provider that actually served the request
    pub provider: String,
    /// Normalized stop reason
    pub stop_reason: StopReason,
    /// Token usage
    pub usage: Usage,
    /// Original max_tokens when the gateway clamped the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_clamped: Option<u32>,
}

impl MessagesResponse {
    /// Build a response with a fresh `msg_` identifier.
    pub fn new(
        text: String,
        provider: String,
        model: String,
        stop_reason: StopReason,
        usage: Usage,
    ) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4().simple()),
            kind: "message".to_string(),
            role: "assistant".to_string(),
            content: vec![ContentBlock::Text { text }],
            model,
            provider,
            stop_reason,
            usage,
            max_tokens_clamped: None,
        }
    }
}
