use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{Chunk, CommitChunk, RetrievedItem, SearchResult};

fn default_limit() -> usize {
    10
}

/// One code or commit hit returned by any of the search tools.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SearchHitOutput {
    pub result_type: String,
    pub score: f32,
    pub repo_path: String,
    pub file_path: Option<String>,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub commit_hash: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub content: String,
}

impl From<&SearchResult> for SearchHitOutput {
    fn from(result: &SearchResult) -> Self {
        match result.item() {
            RetrievedItem::Code(chunk) => Self::from_chunk(chunk, result),
            RetrievedItem::Commit(commit) => Self::from_commit(commit, result),
        }
    }
}

impl SearchHitOutput {
    fn from_chunk(chunk: &Chunk, result: &SearchResult) -> Self {
        Self {
            result_type: "code".to_string(),
            score: result.score(),
            repo_path: result.repo_path().to_string(),
            file_path: Some(chunk.relative_path().to_string()),
            start_line: Some(chunk.start_line()),
            end_line: Some(chunk.end_line()),
            kind: Some(chunk.kind().as_str().to_string()),
            name: chunk.name().map(String::from),
            commit_hash: None,
            author: None,
            date: None,
            content: chunk.content().to_string(),
        }
    }

    fn from_commit(commit: &CommitChunk, result: &SearchResult) -> Self {
        Self {
            result_type: "git".to_string(),
            score: result.score(),
            repo_path: result.repo_path().to_string(),
            file_path: None,
            start_line: None,
            end_line: None,
            kind: Some(commit.commit_type.as_str().to_string()),
            name: None,
            commit_hash: Some(commit.commit_hash.clone()),
            author: Some(commit.author_name.clone()),
            date: Some(commit.date.clone()),
            content: commit.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateCollectionInput {
    pub name: String,
    pub vector_size: usize,
    #[serde(default)]
    pub enable_hybrid: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CollectionNameInput {
    pub name: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CollectionInfoOutput {
    pub points_count: u64,
    pub vector_size: usize,
    pub hybrid_enabled: bool,
    pub distance: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddDocumentsInput {
    pub collection: String,
    pub documents: Vec<DocumentInput>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DocumentInput {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteDocumentsInput {
    pub collection: String,
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VectorSearchInput {
    pub collection: String,
    pub vector: Vec<f32>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HybridVectorSearchInput {
    pub collection: String,
    pub vector: Vec<f32>,
    pub sparse_indices: Vec<u32>,
    pub sparse_values: Vec<f32>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Shared natural-language query input for the code/git/federated search tools.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CodeSearchInput {
    pub path: String,
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub languages: Option<Vec<String>>,
    pub path_pattern: Option<String>,
    pub min_score: Option<f32>,
    #[serde(default)]
    pub use_hybrid: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexCodebaseInput {
    pub path: String,
    #[serde(default)]
    pub force_reindex: bool,
    pub extensions: Option<Vec<String>>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PathInput {
    pub path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexGitHistoryInput {
    pub path: String,
    pub max_commits: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchGitHistoryInput {
    pub path: String,
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub commit_types: Option<Vec<String>>,
    pub authors: Option<Vec<String>>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ContextualSearchInput {
    pub path: String,
    pub query: String,
    /// Restricts the search to one file or directory prefix (a glob pattern
    /// matched against the chunk's relative path), the "context" to search in.
    pub context_path: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FederatedSearchInput {
    pub paths: Vec<String>,
    pub query: String,
    #[serde(default = "default_search_type")]
    pub search_type: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_search_type() -> String {
    "both".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChunkKind, Language};

    #[test]
    fn test_search_hit_output_from_code_chunk() {
        let chunk = Chunk::new(
            "fn f() {}".to_string(),
            1,
            1,
            ChunkKind::Function,
            Language::Rust,
            "/repo/f.rs".to_string(),
            "f.rs".to_string(),
            0,
        )
        .with_name("f");
        let result = SearchResult::new(RetrievedItem::Code(chunk), 0.9, "/repo");
        let output = SearchHitOutput::from(&result);
        assert_eq!(output.result_type, "code");
        assert_eq!(output.name, Some("f".to_string()));
    }
}
