use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::application::interfaces::{
    CancellationToken, Distance, Embedder, Filter, FilterCondition, ProgressCallback, ProgressEvent,
    SnapshotStore, VectorStore,
};
use crate::domain::{
    compute_file_hash, Chunk, CoreError, IndexingMarker, IndexingStatus, Point, Snapshot,
    INDEXING_MARKER_ID,
};

use super::chunker::{chunk_file, ChunkingConfig, SyntaxChunker};
use super::metadata_extractor::{detect_secret, enrich};
use super::scanner::{scan, ScanOptions, ScannedFile};

/// Indexing run outcome, per spec §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub chunks_created: usize,
    pub duration_ms: u64,
    pub status: RunStatus,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStats {
    pub files_added: usize,
    pub files_modified: usize,
    pub files_deleted: usize,
    pub chunks_added: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    NotIndexed,
    InProgress,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    pub status: CollectionStatus,
    pub chunks_count: Option<u64>,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub force_reindex: bool,
    pub extensions: Option<Vec<String>>,
    pub ignore_patterns: Vec<String>,
}

fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Orchestrates a full or incremental index of a codebase into one
/// collection: scan, chunk, embed, upsert, snapshot (spec §4.9).
pub struct CodeIndexer {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    snapshot_store: Arc<dyn SnapshotStore>,
    syntax: Option<Arc<dyn SyntaxChunker>>,
    chunking: ChunkingConfig,
    batch_size: usize,
    batch_retry_attempts: u32,
    max_total_chunks: Option<usize>,
}

impl CodeIndexer {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        snapshot_store: Arc<dyn SnapshotStore>,
        syntax: Option<Arc<dyn SyntaxChunker>>,
        chunking: ChunkingConfig,
        batch_size: usize,
        batch_retry_attempts: u32,
        max_total_chunks: Option<usize>,
    ) -> Self {
        Self {
            vector_store,
            embedder,
            snapshot_store,
            syntax,
            chunking,
            batch_size,
            batch_retry_attempts,
            max_total_chunks,
        }
    }

    /// Full index. Resolves `path` canonically, derives the collection name,
    /// writes an in-progress marker, walks the tree, chunks and embeds every
    /// file, and persists a snapshot on success. Per-file failures accumulate
    /// into `errors` without aborting the run; an unhandled error (e.g. the
    /// vector store itself becoming unreachable) fails the whole run.
    pub async fn index_codebase(
        &self,
        path: &Path,
        collection: &str,
        options: &IndexOptions,
        progress: Option<ProgressCallback>,
        cancellation: Option<CancellationToken>,
    ) -> Result<IndexStats, CoreError> {
        let start = Instant::now();
        let canonical = std::fs::canonicalize(path).map_err(|_| {
            CoreError::invalid_path(path.display().to_string())
        })?;

        if self.vector_store.collection_exists(collection).await? {
            if options.force_reindex {
                self.vector_store.delete_collection(collection).await?;
            }
        }
        if !self.vector_store.collection_exists(collection).await? {
            self.vector_store
                .create_collection(collection, self.embedder.dimensions(), Distance::Cosine, true)
                .await?;
        }

        self.write_marker(collection, IndexingStatus::InProgress).await?;

        let scan_options = ScanOptions {
            extensions: options.extensions.clone(),
            ignore_patterns: options.ignore_patterns.clone(),
        };
        let files = match scan(&canonical, &scan_options) {
            Ok(files) => files,
            Err(e) => {
                self.write_marker(collection, IndexingStatus::Failed).await.ok();
                return Err(e);
            }
        };

        let mut errors = Vec::new();
        let mut file_hashes = BTreeMap::new();
        let mut all_chunks: Vec<Chunk> = Vec::new();
        let mut files_indexed = 0usize;
        let total = files.len() as u64;

        for (i, file) in files.iter().enumerate() {
            if let Some(token) = &cancellation {
                if token.is_cancelled() {
                    self.write_marker(collection, IndexingStatus::Failed).await.ok();
                    return Err(CoreError::Cancelled);
                }
            }
            if let Some(cb) = &progress {
                cb(ProgressEvent::new("scan", i as u64, total, &file.relative_path));
            }

            match self.index_one_file(file) {
                Ok((hash, chunks)) => {
                    file_hashes.insert(file.relative_path.clone(), hash);
                    files_indexed += 1;
                    all_chunks.extend(chunks);
                }
                Err(e) => {
                    warn!("skipping {}: {e}", file.relative_path);
                    errors.push(format!("{}: {e}", file.relative_path));
                }
            }

            if let Some(max) = self.max_total_chunks {
                if all_chunks.len() > max {
                    all_chunks.truncate(max);
                }
            }
        }

        let embed_result = self
            .embed_and_upsert(collection, &all_chunks, progress.as_ref(), cancellation.as_ref())
            .await;

        let status = match embed_result {
            Ok(batch_errors) => {
                errors.extend(batch_errors);
                let snapshot = Snapshot::new(canonical.display().to_string(), now_iso8601(), file_hashes);
                self.snapshot_store.save(collection, &snapshot).await?;
                if errors.is_empty() {
                    RunStatus::Completed
                } else {
                    RunStatus::Partial
                }
            }
            Err(e) => {
                errors.push(e.to_string());
                RunStatus::Failed
            }
        };

        self.write_marker(
            collection,
            if status == RunStatus::Failed {
                IndexingStatus::Failed
            } else {
                IndexingStatus::Complete
            },
        )
        .await
        .ok();

        info!(
            "indexed {} ({} files, {} chunks, {:?})",
            collection,
            files_indexed,
            all_chunks.len(),
            status
        );

        Ok(IndexStats {
            files_scanned: files.len(),
            files_indexed,
            chunks_created: all_chunks.len(),
            duration_ms: start.elapsed().as_millis() as u64,
            status,
            errors,
        })
    }

    /// Incremental reindex against the last snapshot: diffs file hashes,
    /// deletes points for modified/deleted files, re-chunks and embeds
    /// added/modified files, and advances the snapshot.
    pub async fn reindex_changes(
        &self,
        path: &Path,
        collection: &str,
        options: &IndexOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<ChangeStats, CoreError> {
        let start = Instant::now();
        let canonical = std::fs::canonicalize(path).map_err(|_| {
            CoreError::invalid_path(path.display().to_string())
        })?;

        let previous = self
            .snapshot_store
            .load(collection)
            .await?
            .ok_or_else(|| CoreError::SnapshotCorrupt(collection.to_string()))?;

        let scan_options = ScanOptions {
            extensions: options.extensions.clone(),
            ignore_patterns: options.ignore_patterns.clone(),
        };
        let files = scan(&canonical, &scan_options)?;
        let mut current_hashes = BTreeMap::new();
        let mut by_relative: std::collections::HashMap<String, &ScannedFile> = std::collections::HashMap::new();
        for file in &files {
            let content = std::fs::read(&file.absolute_path).map_err(|e| CoreError::FileRead {
                path: file.relative_path.clone(),
                source: e,
            })?;
            current_hashes.insert(file.relative_path.clone(), compute_file_hash(&content));
            by_relative.insert(file.relative_path.clone(), file);
        }

        let diff = crate::domain::FileHashDiff::compute(&previous.file_hashes, &current_hashes);

        if !diff.deleted.is_empty() || !diff.modified.is_empty() {
            let mut paths_to_clear = diff.deleted.clone();
            paths_to_clear.extend(diff.modified.iter().cloned());
            let filter = Filter {
                must: vec![FilterCondition::MatchAny {
                    key: "relative_path".to_string(),
                    values: paths_to_clear.into_iter().map(serde_json::Value::String).collect(),
                }],
                should: Vec::new(),
                must_not: Vec::new(),
            };
            self.vector_store.delete_points_by_filter(collection, filter).await?;
        }

        let mut changed_chunks = Vec::new();
        let to_reindex: Vec<&String> = diff.added.iter().chain(diff.modified.iter()).collect();
        let total = to_reindex.len() as u64;

        for (i, relative) in to_reindex.iter().enumerate() {
            if let Some(cb) = &progress {
                cb(ProgressEvent::new("reindex", i as u64, total, relative.as_str()));
            }
            if let Some(file) = by_relative.get(relative.as_str()) {
                if let Ok((_, chunks)) = self.index_one_file(file) {
                    changed_chunks.extend(chunks);
                }
            }
        }

        let batch_errors = self.embed_and_upsert(collection, &changed_chunks, progress.as_ref(), None).await?;
        for error in &batch_errors {
            warn!("reindex of {collection}: {error}");
        }

        let snapshot = Snapshot::new(canonical.display().to_string(), now_iso8601(), current_hashes);
        self.snapshot_store.save(collection, &snapshot).await?;

        Ok(ChangeStats {
            files_added: diff.added.len(),
            files_modified: diff.modified.len(),
            files_deleted: diff.deleted.len(),
            chunks_added: changed_chunks.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    pub async fn get_index_status(&self, collection: &str) -> Result<IndexStatus, CoreError> {
        if !self.vector_store.collection_exists(collection).await? {
            return Ok(IndexStatus {
                status: CollectionStatus::NotIndexed,
                chunks_count: None,
                last_updated: None,
            });
        }

        let marker = self.vector_store.get_point(collection, INDEXING_MARKER_ID).await?;
        let marker: Option<IndexingMarker> = marker.and_then(|p| serde_json::from_value(p.payload).ok());

        let status = match marker.as_ref().map(|m| m.status) {
            Some(IndexingStatus::InProgress) => CollectionStatus::InProgress,
            Some(IndexingStatus::Failed) => CollectionStatus::Failed,
            Some(IndexingStatus::Complete) | None => CollectionStatus::Ready,
        };

        let info = self.vector_store.get_collection_info(collection).await?;
        Ok(IndexStatus {
            status,
            chunks_count: Some(info.points_count),
            last_updated: marker.map(|m| m.updated_at),
        })
    }

    pub async fn clear_index(&self, collection: &str) -> Result<(), CoreError> {
        self.vector_store.delete_collection(collection).await?;
        self.snapshot_store.delete(collection).await?;
        Ok(())
    }

    fn index_one_file(&self, file: &ScannedFile) -> Result<(String, Vec<Chunk>), CoreError> {
        let content = std::fs::read_to_string(&file.absolute_path).map_err(|e| CoreError::FileRead {
            path: file.relative_path.clone(),
            source: e,
        })?;
        let hash = compute_file_hash(content.as_bytes());

        if let Some(pattern) = detect_secret(&content) {
            warn!("secret-like content ({pattern}) in {}, skipping file", file.relative_path);
            return Ok((hash, Vec::new()));
        }

        let chunks = chunk_file(
            self.syntax.as_deref(),
            &content,
            &file.absolute_path.display().to_string(),
            &file.relative_path,
            file.language,
            &self.chunking,
        );
        let chunks = chunks.into_iter().map(enrich).collect();
        Ok((hash, chunks))
    }

    /// Embeds and upserts `chunks` in batches. A batch that exhausts its
    /// retries records an error and is skipped; subsequent batches still
    /// run (spec §4.9 step 6). Returns the accumulated batch errors; only
    /// cancellation or a vector-store failure aborts the whole run.
    async fn embed_and_upsert(
        &self,
        collection: &str,
        chunks: &[Chunk],
        progress: Option<&ProgressCallback>,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Vec<String>, CoreError> {
        let total = chunks.len() as u64;
        let mut batch_errors = Vec::new();
        for (batch_index, batch) in chunks.chunks(self.batch_size.max(1)).enumerate() {
            if let Some(token) = cancellation {
                if token.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
            }

            let texts: Vec<String> = batch.iter().map(|c| c.content().to_string()).collect();
            let embedded = match self.retry_embed_batch(&texts).await {
                Ok(embedded) => embedded,
                Err(e) => {
                    warn!("batch {batch_index} exhausted retries ({e}), skipping");
                    batch_errors.push(format!("batch {batch_index}: {e}"));
                    continue;
                }
            };

            let points: Vec<Point> = batch
                .iter()
                .zip(embedded)
                .map(|(chunk, embedding)| {
                    let payload = serde_json::json!({
                        "id": chunk.id(),
                        "content": chunk.content(),
                        "start_line": chunk.start_line(),
                        "end_line": chunk.end_line(),
                        "kind": chunk.kind(),
                        "name": chunk.name(),
                        "language": chunk.language(),
                        "file_path": chunk.file_path(),
                        "relative_path": chunk.relative_path(),
                        "file_extension": chunk.file_extension(),
                        "chunk_index": chunk.chunk_index(),
                        "complexity": chunk.complexity(),
                    });
                    Point::new(chunk.id().to_string(), embedding.vector, payload)
                })
                .collect();

            self.vector_store.upsert(collection, points).await?;

            if let Some(cb) = progress {
                cb(ProgressEvent::new(
                    "embed",
                    (batch_index * self.batch_size.max(1)) as u64 + batch.len() as u64,
                    total,
                    "embedding and upserting",
                ));
            }
        }
        Ok(batch_errors)
    }

    async fn retry_embed_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<crate::application::interfaces::EmbeddedText>, CoreError> {
        let mut attempt = 0u32;
        loop {
            match self.embedder.embed_batch(texts).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.batch_retry_attempts => {
                    let backoff = Duration::from_secs(1u64 << attempt);
                    warn!("embedding batch failed ({e}), retrying in {:?}", backoff);
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn write_marker(&self, collection: &str, status: IndexingStatus) -> Result<(), CoreError> {
        let now = now_iso8601();
        let marker = IndexingMarker {
            status,
            started_at: now.clone(),
            updated_at: now,
        };
        self.vector_store.upsert(collection, vec![marker.to_point()]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_serializes_snake_case() {
        let json = serde_json::to_string(&RunStatus::Partial).unwrap();
        assert_eq!(json, "\"partial\"");
    }

    #[test]
    fn test_collection_status_variants() {
        assert_ne!(CollectionStatus::NotIndexed, CollectionStatus::Ready);
    }
}
