//! Ports — the injected collaborators the core orchestrates against.
//!
//! The core never talks to a network or a filesystem directly; it drives
//! these traits. Adapters live with the binary (or in the caller's code).

pub mod llm;
pub mod repo;
pub mod store;

pub use llm::{
    ChatMessage, ChatRole, CompletionRequest, CompletionResponse, FinishReason, LlmTransport,
    StreamItem, TokenUsage, ToolCall, ToolSpec, TransportError, TransportResult,
};
pub use repo::{BlameEntry, CommitInfo, LogQuery, RepoError, RepoResult, RepoSnapshot};
pub use store::{
    DebtOccurrence, FindingStore, SimilarChunk, SimilarityQuery, StoreError, StoreResult,
    TemporalRecorder, VectorSearch,
};
