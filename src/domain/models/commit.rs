use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::chunk::hex16;

/// Conventional-commit classification, assigned by the commit classifier's
/// ordered regex cascade (first match wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitType {
    Feat,
    Fix,
    Refactor,
    Docs,
    Test,
    Chore,
    Style,
    Perf,
    Build,
    Ci,
    Revert,
    Other,
}

impl CommitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Refactor => "refactor",
            CommitType::Docs => "docs",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
            CommitType::Style => "style",
            CommitType::Perf => "perf",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
            CommitType::Revert => "revert",
            CommitType::Other => "other",
        }
    }
}

impl std::fmt::Display for CommitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One file touched by a commit, as parsed from `git log --numstat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    /// `None` for a binary file, where numstat reports `-` instead of a count.
    pub added: Option<u32>,
    pub deleted: Option<u32>,
    pub renamed_from: Option<String>,
}

impl FileChange {
    pub fn is_binary(&self) -> bool {
        self.added.is_none() && self.deleted.is_none()
    }
}

/// A commit as read directly off `git log`, before classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommit {
    pub hash: String,
    /// Git's own disambiguation-aware abbreviation (`%h`), not a fixed
    /// truncation of `hash`.
    pub short_hash: String,
    pub author_name: String,
    pub author_email: String,
    pub date: String,
    pub subject: String,
    pub body: String,
    pub files: Vec<FileChange>,
    pub diff: String,
}

/// Classification metadata attached to a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitMetadata {
    pub commit_type: CommitType,
    pub scope: Option<String>,
}

/// A commit rendered into retrievable text, ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitChunk {
    id: String,
    pub commit_hash: String,
    pub repo_path: String,
    pub author_name: String,
    pub date: String,
    pub commit_type: CommitType,
    pub content: String,
}

impl CommitChunk {
    pub fn new(
        commit_hash: String,
        repo_path: String,
        author_name: String,
        date: String,
        commit_type: CommitType,
        content: String,
    ) -> Self {
        let id = compute_commit_chunk_id(&commit_hash, &repo_path);
        Self {
            id,
            commit_hash,
            repo_path,
            author_name,
            date,
            commit_type,
            content,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// `"gitcommit_" + hex16(SHA256(commitHash:repoPath))`.
pub fn compute_commit_chunk_id(commit_hash: &str, repo_path: &str) -> String {
    let material = format!("{}:{}", commit_hash, repo_path);
    let digest = Sha256::digest(material.as_bytes());
    format!("gitcommit_{}", hex16(&digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_chunk_id_deterministic() {
        let a = compute_commit_chunk_id("abc123", "/repo");
        let b = compute_commit_chunk_id("abc123", "/repo");
        assert_eq!(a, b);
        assert!(a.starts_with("gitcommit_"));
    }

    #[test]
    fn test_commit_chunk_id_differs_by_repo() {
        let a = compute_commit_chunk_id("abc123", "/repo-a");
        let b = compute_commit_chunk_id("abc123", "/repo-b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_file_change_binary_detection() {
        let binary = FileChange {
            path: "image.png".to_string(),
            added: None,
            deleted: None,
            renamed_from: None,
        };
        assert!(binary.is_binary());

        let text = FileChange {
            path: "main.rs".to_string(),
            added: Some(10),
            deleted: Some(2),
            renamed_from: None,
        };
        assert!(!text.is_binary());
    }
}
