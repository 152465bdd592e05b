use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A node in the Merkle tree, stored in a contiguous arena and referenced by
/// index rather than by pointer, so the tree can be built and diffed without
/// per-node heap allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleNode {
    pub hash: String,
    pub left: Option<usize>,
    pub right: Option<usize>,
    /// Present on leaves only: the file path this leaf represents.
    pub path: Option<String>,
}

impl MerkleNode {
    fn leaf(path: String, hash: String) -> Self {
        Self {
            hash,
            left: None,
            right: None,
            path: Some(path),
        }
    }

    fn internal(hash: String, left: usize, right: usize) -> Self {
        Self {
            hash,
            left: Some(left),
            right: Some(right),
            path: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.path.is_some()
    }
}

/// A Merkle tree over a repository's file hashes, built in ascending path
/// order so that two snapshots of the same file set always produce the same
/// root hash regardless of scan order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MerkleTree {
    pub nodes: Vec<MerkleNode>,
    pub root: Option<usize>,
}

fn leaf_hash(path: &str, content_hash: &str) -> String {
    let material = format!("{}:{}", path, content_hash);
    format!("{:x}", Sha256::digest(material.as_bytes()))
}

fn internal_hash(left: &str, right: &str) -> String {
    let material = format!("{}{}", left, right);
    format!("{:x}", Sha256::digest(material.as_bytes()))
}

impl MerkleTree {
    /// Builds a tree from a path→hash map, always processing paths in
    /// ascending lexicographic order.
    pub fn build(file_hashes: &BTreeMap<String, String>) -> Self {
        let mut nodes = Vec::with_capacity(file_hashes.len() * 2);
        let mut level: Vec<usize> = Vec::with_capacity(file_hashes.len());

        for (path, hash) in file_hashes {
            let node = MerkleNode::leaf(path.clone(), leaf_hash(path, hash));
            nodes.push(node);
            level.push(nodes.len() - 1);
        }

        if level.is_empty() {
            return Self {
                nodes,
                root: None,
            };
        }

        while level.len() > 1 {
            let mut next_level = Vec::with_capacity(level.len().div_ceil(2));
            let mut i = 0;
            while i < level.len() {
                if i + 1 < level.len() {
                    let left_idx = level[i];
                    let right_idx = level[i + 1];
                    let hash = internal_hash(&nodes[left_idx].hash, &nodes[right_idx].hash);
                    nodes.push(MerkleNode::internal(hash, left_idx, right_idx));
                    next_level.push(nodes.len() - 1);
                    i += 2;
                } else {
                    // Odd node out: pairs with itself.
                    let only_idx = level[i];
                    let hash = internal_hash(&nodes[only_idx].hash, &nodes[only_idx].hash);
                    nodes.push(MerkleNode::internal(hash, only_idx, only_idx));
                    next_level.push(nodes.len() - 1);
                    i += 1;
                }
            }
            level = next_level;
        }

        Self {
            nodes,
            root: Some(level[0]),
        }
    }

    pub fn root_hash(&self) -> Option<&str> {
        self.root.map(|idx| self.nodes[idx].hash.as_str())
    }
}

/// Diff between two file-hash maps, used to drive incremental indexing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHashDiff {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl FileHashDiff {
    pub fn compute(old: &BTreeMap<String, String>, new: &BTreeMap<String, String>) -> Self {
        let mut added = Vec::new();
        let mut modified = Vec::new();
        let mut deleted = Vec::new();

        for (path, new_hash) in new {
            match old.get(path) {
                None => added.push(path.clone()),
                Some(old_hash) if old_hash != new_hash => modified.push(path.clone()),
                Some(_) => {}
            }
        }
        for path in old.keys() {
            if !new.contains_key(path) {
                deleted.push(path.clone());
            }
        }

        added.sort();
        modified.sort();
        deleted.sort();

        Self {
            added,
            modified,
            deleted,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::build(&BTreeMap::new());
        assert!(tree.root.is_none());
        assert!(tree.root_hash().is_none());
    }

    #[test]
    fn test_single_leaf_root() {
        let files = map(&[("a.rs", "h1")]);
        let tree = MerkleTree::build(&files);
        assert!(tree.root_hash().is_some());
    }

    #[test]
    fn test_deterministic_regardless_of_insertion_order() {
        let a = map(&[("a.rs", "h1"), ("b.rs", "h2"), ("c.rs", "h3")]);
        let mut reordered = BTreeMap::new();
        reordered.insert("c.rs".to_string(), "h3".to_string());
        reordered.insert("a.rs".to_string(), "h1".to_string());
        reordered.insert("b.rs".to_string(), "h2".to_string());

        let tree_a = MerkleTree::build(&a);
        let tree_b = MerkleTree::build(&reordered);
        assert_eq!(tree_a.root_hash(), tree_b.root_hash());
    }

    #[test]
    fn test_odd_node_self_pairs() {
        let files = map(&[("a.rs", "h1"), ("b.rs", "h2"), ("c.rs", "h3")]);
        let tree = MerkleTree::build(&files);
        assert!(tree.root_hash().is_some());
        // 3 leaves -> odd node self-pairs at level 1, giving a single root.
        assert_eq!(tree.nodes.len(), 3 + 2 + 1);
    }

    #[test]
    fn test_diff_detects_added_modified_deleted() {
        let old = map(&[("a.rs", "h1"), ("b.rs", "h2")]);
        let new = map(&[("a.rs", "h1"), ("b.rs", "h2-modified"), ("c.rs", "h3")]);

        let diff = FileHashDiff::compute(&old, &new);
        assert_eq!(diff.added, vec!["c.rs".to_string()]);
        assert_eq!(diff.modified, vec!["b.rs".to_string()]);
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn test_diff_empty_when_unchanged() {
        let files = map(&[("a.rs", "h1")]);
        let diff = FileHashDiff::compute(&files, &files);
        assert!(diff.is_empty());
    }
}
