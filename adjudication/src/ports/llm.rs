//! LLM transport port.
//!
//! The core consumes final responses only; streaming is an optional UX
//! affordance. Tool-calls are the sole structured channel — natural
//! language output is never parsed for findings.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network-layer failure. Retried per policy.
    #[error("network error: {0}")]
    Network(String),

    /// Provider pushed back; retry after backoff.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Authentication or quota rejection. Fatal for the calling agent.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The provider answered with something unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Cooperative cancellation observed mid-call.
    #[error("cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether a retry can help.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited(_))
    }

    /// Whether the calling agent must stop entirely.
    pub fn is_fatal_for_agent(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Provider-agnostic tool definition: a name, a purpose, and a JSON schema
/// for the arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// One structured tool invocation from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
    pub finish_reason: FinishReason,
}

/// An item of a streamed completion.
#[derive(Debug, Clone)]
pub enum StreamItem {
    Content(String),
    ToolCall(ToolCall),
    Done(FinishReason),
}

/// The injected LLM boundary. Implementations must be `Send + Sync`;
/// calls may suspend for arbitrary duration and must return promptly on
/// cancellation of the surrounding task.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> TransportResult<CompletionResponse>;

    /// JSON output constrained by `schema` (provider-agnostic JSON Schema).
    async fn complete_structured(
        &self,
        request: CompletionRequest,
        schema: Value,
    ) -> TransportResult<Value>;

    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> TransportResult<BoxStream<'static, TransportResult<StreamItem>>>;
}
