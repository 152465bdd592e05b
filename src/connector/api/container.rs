use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::application::interfaces::{Embedder, GitExtractor, SnapshotStore, VectorStore};
use crate::application::use_cases::{self, ChunkingConfig, CodeIndexer, GitIndexer, Retriever, SyntaxChunker};
use crate::config::CoreConfig;
use crate::connector::adapter::{FsSnapshotStore, InMemoryVectorStore, MockEmbedder, ProcessGitExtractor, TreeSitterChunker};
use crate::domain::CoreError;

const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;
const GIT_TIMEOUT_SECS: u64 = 30;
const GIT_MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;
const MIN_CHUNK_CHARS: usize = 20;

/// Expands a leading `~` to `$HOME`; any other path is returned unchanged.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

fn default_snapshot_dir() -> PathBuf {
    expand_tilde("~/.codectx/snapshots")
}

/// Wires `CoreConfig` into concrete adapters and exposes factory methods for
/// the use-case orchestrators. Only the in-process adapters are wired today
/// (mock embedder, in-memory vector store, filesystem snapshots, subprocess
/// git); swapping in a hosted embedder or vector database means adding a
/// branch here keyed on `config.embedding_provider` / `config.vector_store_url`,
/// not touching the use cases.
pub struct Container {
    config: CoreConfig,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    snapshot_store: Arc<dyn SnapshotStore>,
    git: Arc<dyn GitExtractor>,
    syntax: Arc<dyn SyntaxChunker>,
}

impl Container {
    pub fn new(config: CoreConfig) -> Self {
        let dimensions = config.embedding_dimensions.unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS);
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::new(dimensions));
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let snapshot_store: Arc<dyn SnapshotStore> = Arc::new(FsSnapshotStore::new(default_snapshot_dir()));
        let git: Arc<dyn GitExtractor> = Arc::new(ProcessGitExtractor::new(
            Duration::from_secs(GIT_TIMEOUT_SECS),
            GIT_MAX_OUTPUT_BYTES,
            config.max_diff_size,
        ));
        let syntax: Arc<dyn SyntaxChunker> = Arc::new(TreeSitterChunker::new());

        Self {
            config,
            embedder,
            vector_store,
            snapshot_store,
            git,
            syntax,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    pub fn snapshot_store(&self) -> Arc<dyn SnapshotStore> {
        self.snapshot_store.clone()
    }

    pub fn git_extractor(&self) -> Arc<dyn GitExtractor> {
        self.git.clone()
    }

    pub fn code_indexer(&self) -> CodeIndexer {
        let chunking = ChunkingConfig {
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            min_chunk_chars: MIN_CHUNK_CHARS,
            max_chunks_per_file: self.config.max_chunks_per_file,
        };
        CodeIndexer::new(
            self.vector_store.clone(),
            self.embedder.clone(),
            self.snapshot_store.clone(),
            Some(self.syntax.clone()),
            chunking,
            self.config.batch_size,
            self.config.batch_retry_attempts,
            self.config.max_total_chunks,
        )
    }

    pub fn git_indexer(&self) -> GitIndexer {
        GitIndexer::new(
            self.vector_store.clone(),
            self.embedder.clone(),
            self.snapshot_store.clone(),
            self.git.clone(),
            self.config.batch_size,
            self.config.batch_retry_attempts,
        )
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(self.vector_store.clone(), self.embedder.clone())
    }

    /// Derives the code collection name for `repo_path`, consulting the git
    /// remote when available so clones of the same repo on different
    /// machines share one collection.
    pub async fn code_collection_name(&self, repo_path: &Path) -> Result<String, CoreError> {
        self.derive_collection_name("code", repo_path).await
    }

    pub async fn git_collection_name(&self, repo_path: &Path) -> Result<String, CoreError> {
        self.derive_collection_name("gitcommit", repo_path).await
    }

    async fn derive_collection_name(&self, prefix: &str, repo_path: &Path) -> Result<String, CoreError> {
        let canonical = std::fs::canonicalize(repo_path)
            .map_err(|_| CoreError::invalid_path(repo_path.display().to_string()))?;
        let repo_path_str = canonical.display().to_string();
        let remote = self.git.remote_url(&repo_path_str).await.unwrap_or_default();
        Ok(use_cases::collection_name(prefix, &remote, &repo_path_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_substitutes_home() {
        std::env::set_var("HOME", "/home/test");
        let expanded = expand_tilde("~/.codectx/snapshots");
        std::env::remove_var("HOME");
        assert_eq!(expanded, PathBuf::from("/home/test/.codectx/snapshots"));
    }

    #[test]
    fn test_expand_tilde_leaves_absolute_path() {
        assert_eq!(expand_tilde("/var/data"), PathBuf::from("/var/data"));
    }

    #[tokio::test]
    async fn test_code_collection_name_stable_for_same_path() {
        let container = Container::new(CoreConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let a = container.code_collection_name(dir.path()).await.unwrap();
        let b = container.code_collection_name(dir.path()).await.unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("code_"));
    }
}
