use serde::{Deserialize, Serialize};

use super::chunk::Chunk;
use super::commit::CommitChunk;

/// Distinguishes code chunks from commit chunks in a federated result set,
/// so the federator can group ranks per `(repo_path, result_type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    Code,
    Commit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RetrievedItem {
    Code(Chunk),
    Commit(CommitChunk),
}

impl RetrievedItem {
    pub fn id(&self) -> &str {
        match self {
            RetrievedItem::Code(c) => c.id(),
            RetrievedItem::Commit(c) => c.id(),
        }
    }

    pub fn result_type(&self) -> ResultType {
        match self {
            RetrievedItem::Code(_) => ResultType::Code,
            RetrievedItem::Commit(_) => ResultType::Commit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    item: RetrievedItem,
    score: f32,
    repo_path: String,
    highlights: Option<Vec<String>>,
}

impl SearchResult {
    pub fn new(item: RetrievedItem, score: f32, repo_path: impl Into<String>) -> Self {
        Self {
            item,
            score,
            repo_path: repo_path.into(),
            highlights: None,
        }
    }

    pub fn with_highlights(mut self, highlights: Vec<String>) -> Self {
        self.highlights = Some(highlights);
        self
    }

    pub fn item(&self) -> &RetrievedItem {
        &self.item
    }

    pub fn chunk(&self) -> Option<&Chunk> {
        match &self.item {
            RetrievedItem::Code(c) => Some(c),
            RetrievedItem::Commit(_) => None,
        }
    }

    pub fn id(&self) -> &str {
        self.item.id()
    }

    pub fn result_type(&self) -> ResultType {
        self.item.result_type()
    }

    pub fn repo_path(&self) -> &str {
        &self.repo_path
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn highlights(&self) -> Option<&[String]> {
        self.highlights.as_deref()
    }

    pub fn is_relevant(&self, threshold: f32) -> bool {
        self.score >= threshold
    }
}

/// A search request against the code or commit index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    query: String,
    limit: usize,
    min_score: Option<f32>,
    languages: Option<Vec<String>>,
    repository_ids: Option<Vec<String>>,
    node_types: Option<Vec<String>>,
    /// Glob pattern (globset syntax) matched against `Chunk::relative_path`.
    path_pattern: Option<String>,
    hybrid: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 10,
            min_score: None,
            languages: None,
            repository_ids: None,
            node_types: None,
            path_pattern: None,
            hybrid: false,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_min_score(mut self, score: f32) -> Self {
        self.min_score = Some(score);
        self
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = Some(languages);
        self
    }

    pub fn with_repositories(mut self, ids: Vec<String>) -> Self {
        self.repository_ids = Some(ids);
        self
    }

    pub fn with_node_types(mut self, types: Vec<String>) -> Self {
        self.node_types = Some(types);
        self
    }

    pub fn with_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.path_pattern = Some(pattern.into());
        self
    }

    pub fn with_hybrid(mut self, hybrid: bool) -> Self {
        self.hybrid = hybrid;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn min_score(&self) -> Option<f32> {
        self.min_score
    }

    pub fn languages(&self) -> Option<&[String]> {
        self.languages.as_deref()
    }

    pub fn repository_ids(&self) -> Option<&[String]> {
        self.repository_ids.as_deref()
    }

    pub fn node_types(&self) -> Option<&[String]> {
        self.node_types.as_deref()
    }

    pub fn path_pattern(&self) -> Option<&str> {
        self.path_pattern.as_deref()
    }

    pub fn is_hybrid(&self) -> bool {
        self.hybrid
    }

    pub fn has_filters(&self) -> bool {
        self.languages.is_some()
            || self.repository_ids.is_some()
            || self.node_types.is_some()
            || self.path_pattern.is_some()
    }

    pub fn filters_by_language(&self, language: &str) -> bool {
        self.languages
            .as_ref()
            .is_some_and(|langs| langs.iter().any(|l| l == language))
    }

    pub fn filters_by_repository(&self, repo_id: &str) -> bool {
        self.repository_ids
            .as_ref()
            .is_some_and(|ids| ids.contains(&repo_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::chunk::ChunkKind;
    use crate::domain::models::language::Language;

    fn sample_chunk() -> Chunk {
        Chunk::new(
            "fn test() {}".to_string(),
            1,
            1,
            ChunkKind::Function,
            Language::Rust,
            "/repo/test.rs".to_string(),
            "test.rs".to_string(),
            0,
        )
    }

    #[test]
    fn test_search_result_creation() {
        let chunk = sample_chunk();
        let result = SearchResult::new(RetrievedItem::Code(chunk), 0.95, "/repo");

        assert_eq!(result.score(), 0.95);
        assert_eq!(result.result_type(), ResultType::Code);
        assert!(result.is_relevant(0.5));
        assert!(!result.is_relevant(0.99));
    }

    #[test]
    fn test_search_query_builder() {
        let query = SearchQuery::new("find functions")
            .with_limit(20)
            .with_min_score(0.7)
            .with_languages(vec!["rust".to_string()])
            .with_path_pattern("src/**/*.rs");

        assert_eq!(query.query(), "find functions");
        assert_eq!(query.limit(), 20);
        assert_eq!(query.min_score(), Some(0.7));
        assert!(query.has_filters());
        assert_eq!(query.path_pattern(), Some("src/**/*.rs"));
    }

    #[test]
    fn test_query_filters() {
        let query =
            SearchQuery::new("test").with_languages(vec!["rust".to_string(), "python".to_string()]);

        assert!(query.filters_by_language("rust"));
        assert!(query.filters_by_language("python"));
        assert!(!query.filters_by_language("go"));
    }
}
