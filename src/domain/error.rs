use thiserror::Error;

/// Error kinds surfaced by the core engine. Disposition per kind is documented
/// alongside each orchestrator in `application::use_cases`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not a git repository: {0}")]
    NotARepository(String),

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("secret detected in {path}:{start}-{end}")]
    SecretDetected { path: String, start: u32, end: u32 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("git subprocess error: {0}")]
    GitSubprocess(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("rate limited, retry after {retry_after_secs:?}s")]
    RateLimit { retry_after_secs: Option<u64> },

    #[error("vector store error: {0}")]
    VectorStore(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid date range: {from} > {to}")]
    InvalidDateRange { from: String, to: String },

    #[error("snapshot corrupt or missing: {0}")]
    SnapshotCorrupt(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn git_subprocess(msg: impl Into<String>) -> Self {
        Self::GitSubprocess(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn vector_store(msg: impl Into<String>) -> Self {
        Self::VectorStore(msg.into())
    }

    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Transient errors are worth retrying with backoff (spec §7).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Embedding(_) | Self::RateLimit { .. } | Self::VectorStore(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
