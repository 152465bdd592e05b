use serde::{Deserialize, Serialize};

/// A single file's content hash, keyed by path relative to the codebase root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHash {
    path: String,
    hash: String,
}

impl FileHash {
    pub fn new(path: String, hash: String) -> Self {
        Self { path, hash }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Computes the SHA-256 hash of file content, used both for the file-hash map
/// and as Merkle leaf material.
pub fn compute_file_hash(content: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let hash = Sha256::digest(content);
    format!("{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_hash_creation() {
        let hash = FileHash::new("src/main.rs".to_string(), "abc123".to_string());

        assert_eq!(hash.path(), "src/main.rs");
        assert_eq!(hash.hash(), "abc123");
    }

    #[test]
    fn test_compute_file_hash() {
        let content = b"fn main() {}";
        let hash = compute_file_hash(content);

        assert_eq!(hash.len(), 64);

        let hash2 = compute_file_hash(content);
        assert_eq!(hash, hash2);

        let hash3 = compute_file_hash(b"fn main() { println!(\"hello\"); }");
        assert_ne!(hash, hash3);
    }
}
