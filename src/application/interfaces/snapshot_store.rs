use async_trait::async_trait;

use crate::domain::{CoreError, Snapshot};

/// Persistence for the last-seen file-hash map / Merkle root of a collection.
/// Corrupt or missing snapshots are treated as absent by `load`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, collection: &str, snapshot: &Snapshot) -> Result<(), CoreError>;

    async fn load(&self, collection: &str) -> Result<Option<Snapshot>, CoreError>;

    async fn exists(&self, collection: &str) -> Result<bool, CoreError>;

    async fn delete(&self, collection: &str) -> Result<(), CoreError>;

    /// Names of every collection with a persisted snapshot, for the
    /// `list_collections` tool-call surface.
    async fn list(&self) -> Result<Vec<String>, CoreError>;
}
