//! Persistence and vector-search ports.
//!
//! The core writes findings, plans, and occurrence records through these
//! traits; trends and retention are the external store's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::finding::{Finding, Severity};
use crate::plan::RemediationPlan;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Idempotent sink for findings and plans.
#[async_trait]
pub trait FindingStore: Send + Sync {
    /// Upsert keyed by finding id.
    async fn upsert_finding(&self, finding: &Finding) -> StoreResult<()>;

    /// Insert keyed by scan id; repeated inserts for one scan are no-ops.
    async fn insert_plan(&self, scan_id: &str, plan: &RemediationPlan) -> StoreResult<()>;
}

/// One validated finding's occurrence in one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtOccurrence {
    pub fingerprint: String,
    pub scan_id: String,
    pub repository_id: String,
    pub file_path: String,
    pub severity: Severity,
    pub confidence: f64,
    pub is_resolved: bool,
}

/// Temporal store boundary. Must be idempotent on `(fingerprint, scan_id)`;
/// the core records occurrences, the store computes trends.
#[async_trait]
pub trait TemporalRecorder: Send + Sync {
    async fn record(&self, occurrence: DebtOccurrence) -> StoreResult<()>;
}

/// Similarity query over code chunks.
#[derive(Debug, Clone)]
pub struct SimilarityQuery {
    pub query: String,
    pub repository_id: String,
    pub limit: usize,
    pub threshold: f64,
    pub file_filter: Option<String>,
}

/// One similar chunk.
#[derive(Debug, Clone)]
pub struct SimilarChunk {
    pub file_path: String,
    pub content: String,
    pub start_line: u32,
    pub end_line: u32,
    pub similarity: f64,
}

/// Optional vector-search boundary.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn search_similar(&self, query: SimilarityQuery) -> StoreResult<Vec<SimilarChunk>>;
}
