use async_trait::async_trait;

use crate::domain::{CoreError, RawCommit};

#[derive(Debug, Clone, Default)]
pub struct CommitQuery {
    pub since_commit: Option<String>,
    pub since_date: Option<String>,
    pub max_commits: Option<u32>,
}

/// Invokes `git` as a subprocess, one argument array per call — never a
/// shell string. Implementations enforce a bounded output buffer and a
/// per-call timeout.
#[async_trait]
pub trait GitExtractor: Send + Sync {
    async fn validate_repository(&self, repo_path: &str) -> Result<bool, CoreError>;

    async fn latest_commit_hash(&self, repo_path: &str) -> Result<String, CoreError>;

    async fn commit_count(
        &self,
        repo_path: &str,
        since_commit: Option<&str>,
    ) -> Result<u64, CoreError>;

    /// Missing remote returns an empty string, never an error.
    async fn remote_url(&self, repo_path: &str) -> Result<String, CoreError>;

    async fn commits(
        &self,
        repo_path: &str,
        query: CommitQuery,
    ) -> Result<Vec<RawCommit>, CoreError>;

    /// Truncated to `maxDiffSize` with a trailing marker line.
    async fn commit_diff(&self, repo_path: &str, hash: &str) -> Result<String, CoreError>;
}
