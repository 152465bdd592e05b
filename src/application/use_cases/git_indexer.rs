use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::application::interfaces::{
    CommitQuery, Distance, Embedder, Filter, FilterCondition, GitExtractor, ProgressCallback,
    ProgressEvent, SnapshotStore, VectorStore,
};
use crate::domain::{CommitType, CoreError, Point, Snapshot};

use super::commit_chunker::render_commit;
use super::commit_classifier::classify_commit;

const MAX_CHUNK_SIZE: usize = 4000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitIndexStats {
    pub commits_scanned: usize,
    pub commits_indexed: usize,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCommitStats {
    pub commits_added: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct HistorySearchFilter {
    pub commit_types: Vec<CommitType>,
    pub authors: Vec<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Orchestrates indexing of git commit history into a collection, mirroring
/// `CodeIndexer`'s shape over `GitExtractor` + classifier + chunker (spec §4.10).
pub struct GitIndexer {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    snapshot_store: Arc<dyn SnapshotStore>,
    git: Arc<dyn GitExtractor>,
    batch_size: usize,
    batch_retry_attempts: u32,
}

impl GitIndexer {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        snapshot_store: Arc<dyn SnapshotStore>,
        git: Arc<dyn GitExtractor>,
        batch_size: usize,
        batch_retry_attempts: u32,
    ) -> Self {
        Self {
            vector_store,
            embedder,
            snapshot_store,
            git,
            batch_size,
            batch_retry_attempts,
        }
    }

    /// Full history index: validates the repository, pulls every commit up
    /// to `max_commits`, classifies and renders each, embeds and upserts in
    /// batches, then records the HEAD hash as the collection's snapshot.
    pub async fn index_git_history(
        &self,
        repo_path: &Path,
        collection: &str,
        max_commits: Option<u32>,
        progress: Option<ProgressCallback>,
    ) -> Result<GitIndexStats, CoreError> {
        let start = Instant::now();
        let repo_path_str = repo_path.display().to_string();

        if !self.git.validate_repository(&repo_path_str).await? {
            return Err(CoreError::NotARepository(repo_path_str));
        }

        if !self.vector_store.collection_exists(collection).await? {
            self.vector_store
                .create_collection(collection, self.embedder.dimensions(), Distance::Cosine, true)
                .await?;
        }

        let commits = self
            .git
            .commits(
                &repo_path_str,
                CommitQuery {
                    since_commit: None,
                    since_date: None,
                    max_commits,
                },
            )
            .await?;

        let mut errors = Vec::new();
        let mut commits_indexed = 0usize;
        let total = commits.len() as u64;
        let mut points_batch = Vec::new();

        for (i, commit) in commits.iter().enumerate() {
            if let Some(cb) = &progress {
                cb(ProgressEvent::new("git", i as u64, total, &commit.subject));
            }
            let commit_type = classify_commit(&commit.subject, &commit.body);
            let chunk = render_commit(commit, commit_type, &repo_path_str, MAX_CHUNK_SIZE);

            match self.embed_commit(&chunk).await {
                Ok(point) => {
                    points_batch.push(point);
                    commits_indexed += 1;
                }
                Err(e) => {
                    warn!("skipping commit {}: {e}", commit.hash);
                    errors.push(format!("{}: {e}", commit.hash));
                }
            }

            if points_batch.len() >= self.batch_size {
                self.vector_store.upsert(collection, std::mem::take(&mut points_batch)).await?;
            }
        }
        if !points_batch.is_empty() {
            self.vector_store.upsert(collection, points_batch).await?;
        }

        if let Some(latest) = commits.first() {
            let mut file_hashes = std::collections::BTreeMap::new();
            file_hashes.insert("HEAD".to_string(), latest.hash.clone());
            let snapshot = Snapshot::new(repo_path_str, now_iso8601(), file_hashes);
            self.snapshot_store.save(collection, &snapshot).await?;
        }

        info!("indexed {} commits into {}", commits_indexed, collection);

        Ok(GitIndexStats {
            commits_scanned: commits.len(),
            commits_indexed,
            duration_ms: start.elapsed().as_millis() as u64,
            errors,
        })
    }

    /// Indexes only commits newer than the snapshot's last-seen HEAD.
    /// Requires a prior full index (an existing collection + snapshot).
    pub async fn index_new_commits(
        &self,
        repo_path: &Path,
        collection: &str,
    ) -> Result<NewCommitStats, CoreError> {
        let start = Instant::now();
        let repo_path_str = repo_path.display().to_string();

        let snapshot = self
            .snapshot_store
            .load(collection)
            .await?
            .ok_or_else(|| CoreError::SnapshotCorrupt(collection.to_string()))?;
        let last_hash = snapshot.file_hashes.get("HEAD").cloned();

        let commits = self
            .git
            .commits(
                &repo_path_str,
                CommitQuery {
                    since_commit: last_hash,
                    since_date: None,
                    max_commits: None,
                },
            )
            .await?;

        let mut points = Vec::new();
        for commit in &commits {
            let commit_type = classify_commit(&commit.subject, &commit.body);
            let chunk = render_commit(commit, commit_type, &repo_path_str, MAX_CHUNK_SIZE);
            points.push(self.embed_commit(&chunk).await?);
        }
        if !points.is_empty() {
            self.vector_store.upsert(collection, points).await?;
        }

        if let Some(latest) = commits.first() {
            let mut file_hashes = std::collections::BTreeMap::new();
            file_hashes.insert("HEAD".to_string(), latest.hash.clone());
            let updated = Snapshot::new(repo_path_str, now_iso8601(), file_hashes);
            self.snapshot_store.save(collection, &updated).await?;
        }

        Ok(NewCommitStats {
            commits_added: commits.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Builds the commit-history filter: commit types and authors combine
    /// with OR within themselves and AND against the date range. Rejects an
    /// inverted date range before any vector-store call.
    pub fn build_history_filter(filter: &HistorySearchFilter) -> Result<Option<Filter>, CoreError> {
        if let (Some(from), Some(to)) = (&filter.date_from, &filter.date_to) {
            if from > to {
                return Err(CoreError::InvalidDateRange {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        let mut must = Vec::new();
        let mut should = Vec::new();

        if !filter.commit_types.is_empty() {
            should.extend(filter.commit_types.iter().map(|t| FilterCondition::Match {
                key: "commit_type".to_string(),
                value: serde_json::Value::String(t.as_str().to_string()),
            }));
        }
        if !filter.authors.is_empty() {
            must.push(FilterCondition::MatchAny {
                key: "author_name".to_string(),
                values: filter.authors.iter().map(|a| serde_json::Value::String(a.clone())).collect(),
            });
        }
        if filter.date_from.is_some() || filter.date_to.is_some() {
            must.push(FilterCondition::Range {
                key: "date".to_string(),
                gte: filter.date_from.clone().map(serde_json::Value::String),
                lte: filter.date_to.clone().map(serde_json::Value::String),
            });
        }

        if must.is_empty() && should.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Filter {
                must,
                should,
                must_not: Vec::new(),
            }))
        }
    }

    async fn embed_commit(&self, chunk: &crate::domain::CommitChunk) -> Result<Point, CoreError> {
        let embedded = self.retry_embed(&chunk.content).await?;
        let payload = serde_json::json!({
            "id": chunk.id(),
            "commit_hash": chunk.commit_hash,
            "repo_path": chunk.repo_path,
            "author_name": chunk.author_name,
            "date": chunk.date,
            "commit_type": chunk.commit_type,
            "content": chunk.content,
        });
        Ok(Point::new(chunk.id().to_string(), embedded.vector, payload))
    }

    async fn retry_embed(&self, text: &str) -> Result<crate::application::interfaces::EmbeddedText, CoreError> {
        let mut attempt = 0u32;
        loop {
            match self.embedder.embed(text).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.batch_retry_attempts => {
                    let backoff = Duration::from_secs(1u64 << attempt);
                    warn!("embedding commit failed ({e}), retrying in {:?}", backoff);
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_date_range_rejected() {
        let filter = HistorySearchFilter {
            commit_types: Vec::new(),
            authors: Vec::new(),
            date_from: Some("2024-06-01".to_string()),
            date_to: Some("2024-01-01".to_string()),
        };
        assert!(GitIndexer::build_history_filter(&filter).is_err());
    }

    #[test]
    fn test_empty_filter_is_none() {
        let filter = HistorySearchFilter::default();
        assert!(GitIndexer::build_history_filter(&filter).unwrap().is_none());
    }

    #[test]
    fn test_commit_types_use_should() {
        let filter = HistorySearchFilter {
            commit_types: vec![CommitType::Feat, CommitType::Fix],
            authors: Vec::new(),
            date_from: None,
            date_to: None,
        };
        let built = GitIndexer::build_history_filter(&filter).unwrap().unwrap();
        assert_eq!(built.should.len(), 2);
    }
}
