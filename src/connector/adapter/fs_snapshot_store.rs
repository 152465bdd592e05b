use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use crate::application::interfaces::SnapshotStore;
use crate::domain::{CoreError, Snapshot};

/// Persists snapshots as one JSON file per collection under `base_dir`,
/// written atomically (`<name>.json.tmp` then renamed over `<name>.json`) so
/// a crash mid-write never leaves a half-written snapshot in place.
pub struct FsSnapshotStore {
    base_dir: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn path_for(&self, collection: &str) -> PathBuf {
        self.base_dir.join(format!("{collection}.json"))
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn save(&self, collection: &str, snapshot: &Snapshot) -> Result<(), CoreError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let final_path = self.path_for(collection);
        let tmp_path = final_path.with_extension("json.tmp");

        let contents = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| CoreError::internal(format!("failed to serialize snapshot: {e}")))?;

        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    async fn load(&self, collection: &str) -> Result<Option<Snapshot>, CoreError> {
        let path = self.path_for(collection);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::from(e)),
        };

        match serde_json::from_slice(&contents) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("snapshot {} is corrupt ({e}), treating as absent", path.display());
                Ok(None)
            }
        }
    }

    async fn exists(&self, collection: &str) -> Result<bool, CoreError> {
        Ok(path_exists(&self.path_for(collection)).await)
    }

    async fn delete(&self, collection: &str) -> Result<(), CoreError> {
        match tokio::fs::remove_file(self.path_for(collection)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::from(e)),
        }
    }

    async fn list(&self) -> Result<Vec<String>, CoreError> {
        let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CoreError::from(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_snapshot() -> Snapshot {
        let mut hashes = BTreeMap::new();
        hashes.insert("a.rs".to_string(), "hash-a".to_string());
        Snapshot::new("/repo".to_string(), "2026-01-01T00:00:00Z".to_string(), hashes)
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(dir.path());
        let snapshot = sample_snapshot();

        store.save("coll", &snapshot).await.unwrap();
        let loaded = store.load("coll").await.unwrap().unwrap();
        assert_eq!(loaded.codebase_path, snapshot.codebase_path);
        assert_eq!(loaded.merkle_root, snapshot.merkle_root);
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(dir.path());
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(dir.path());
        tokio::fs::create_dir_all(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("coll.json"), b"not json").await.unwrap();

        assert!(store.load("coll").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(dir.path());
        store.save("coll", &sample_snapshot()).await.unwrap();

        assert!(store.exists("coll").await.unwrap());
        store.delete("coll").await.unwrap();
        assert!(!store.exists("coll").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_returns_sorted_collection_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(dir.path());
        store.save("beta", &sample_snapshot()).await.unwrap();
        store.save("alpha", &sample_snapshot()).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[tokio::test]
    async fn test_list_empty_when_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let store = FsSnapshotStore::new(missing);
        assert!(store.list().await.unwrap().is_empty());
    }
}
