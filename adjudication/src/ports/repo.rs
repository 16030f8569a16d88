//! Repository snapshot port.

use async_trait::async_trait;

/// Error type for repository access.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("repository access failed: {0}")]
    Access(String),
}

/// Result type for repository access.
pub type RepoResult<T> = Result<T, RepoError>;

/// Query over commit history.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// Restrict to commits touching this file.
    pub file: Option<String>,
    pub limit: Option<usize>,
}

/// One commit as seen through the snapshot.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub sha: String,
    pub author: String,
    pub date: chrono::DateTime<chrono::Utc>,
    pub message: String,
}

/// Attribution for one line of a blamed range.
#[derive(Debug, Clone)]
pub struct BlameEntry {
    pub line: u32,
    pub sha: String,
    pub author: String,
}

/// The injected repository boundary.
#[async_trait]
pub trait RepoSnapshot: Send + Sync {
    async fn list_files(&self, repo_id: &str) -> RepoResult<Vec<String>>;

    async fn file_content(&self, repo_id: &str, path: &str) -> RepoResult<String>;

    async fn log(&self, repo_id: &str, query: LogQuery) -> RepoResult<Vec<CommitInfo>>;

    async fn blame(
        &self,
        repo_id: &str,
        path: &str,
        start_line: u32,
        end_line: u32,
    ) -> RepoResult<Vec<BlameEntry>>;

    async fn diff(&self, repo_id: &str, sha: &str) -> RepoResult<String>;

    async fn default_branch(&self, repo_id: &str) -> RepoResult<String>;
}
