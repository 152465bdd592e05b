use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::merkle::MerkleTree;

/// A point-in-time record of a codebase's file hashes and Merkle root,
/// persisted by the snapshot store and diffed against on the next index run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub codebase_path: String,
    pub timestamp: String,
    pub file_hashes: BTreeMap<String, String>,
    pub merkle_root: Option<String>,
}

impl Snapshot {
    pub fn new(codebase_path: String, timestamp: String, file_hashes: BTreeMap<String, String>) -> Self {
        let merkle_root = MerkleTree::build(&file_hashes).root_hash().map(String::from);
        Self {
            codebase_path,
            timestamp,
            file_hashes,
            merkle_root,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_computes_merkle_root() {
        let mut files = BTreeMap::new();
        files.insert("a.rs".to_string(), "hash-a".to_string());
        let snapshot = Snapshot::new("/repo".to_string(), "2026-01-01T00:00:00Z".to_string(), files);
        assert!(snapshot.merkle_root.is_some());
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_empty_snapshot_has_no_root() {
        let snapshot = Snapshot::new("/repo".to_string(), "2026-01-01T00:00:00Z".to_string(), BTreeMap::new());
        assert!(snapshot.merkle_root.is_none());
        assert!(snapshot.is_empty());
    }
}
