use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{CoreError, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    Cosine,
    Euclid,
    Dot,
}

#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
    pub vector_size: usize,
    pub hybrid_enabled: bool,
    pub distance: Distance,
}

/// A single leaf of the filter language: `{key, match: value|any|glob}` or
/// `{key, range: {gte?, lte?}}`. `Glob`'s `pattern` is `globset` syntax
/// (`**`, `*`, `?`, character classes), matched against a string field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    Match { key: String, value: Value },
    MatchAny { key: String, values: Vec<Value> },
    Glob { key: String, pattern: String },
    Range {
        key: String,
        gte: Option<Value>,
        lte: Option<Value>,
    },
}

/// `{must:[...], should:[...], must_not:[...]}`, each leaf a `FilterCondition`.
/// An empty filter (all three lists empty) means no filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub must: Vec<FilterCondition>,
    #[serde(default)]
    pub should: Vec<FilterCondition>,
    #[serde(default)]
    pub must_not: Vec<FilterCondition>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }

    /// Rewrites a plain `{key: value}` map into `{must: [{key, match: {value}}, ...]}`,
    /// per spec §4.11's filter construction rule.
    pub fn from_plain_map(map: &serde_json::Map<String, Value>) -> Self {
        let must = map
            .iter()
            .map(|(k, v)| FilterCondition::Match {
                key: k.clone(),
                value: v.clone(),
            })
            .collect();
        Self {
            must,
            should: Vec::new(),
            must_not: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Hit {
    pub point: Point,
    pub score: f32,
}

/// The vector storage capability consumed by the indexers and retriever.
/// Implementing an actual vector index is out of scope; this is the
/// interface an adapter wraps around a real store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
        enable_hybrid: bool,
    ) -> Result<(), CoreError>;

    async fn collection_exists(&self, name: &str) -> Result<bool, CoreError>;

    async fn get_collection_info(&self, name: &str) -> Result<CollectionInfo, CoreError>;

    async fn delete_collection(&self, name: &str) -> Result<(), CoreError>;

    async fn upsert(&self, name: &str, points: Vec<Point>) -> Result<(), CoreError>;

    async fn upsert_with_sparse(&self, name: &str, points: Vec<Point>) -> Result<(), CoreError>;

    /// Uses the named vector `dense` iff the collection is hybrid.
    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<Filter>,
    ) -> Result<Vec<Hit>, CoreError>;

    /// Performs RRF fusion server-side across the dense and sparse legs.
    /// Falls back to dense-only when the collection lacks sparse configuration.
    async fn hybrid_search(
        &self,
        name: &str,
        dense_vector: &[f32],
        sparse_vector: &crate::domain::SparseVector,
        limit: usize,
        filter: Option<Filter>,
    ) -> Result<Vec<Hit>, CoreError>;

    async fn get_point(&self, name: &str, id: &str) -> Result<Option<Point>, CoreError>;

    async fn delete_points(&self, name: &str, ids: &[String]) -> Result<(), CoreError>;

    async fn delete_points_by_filter(&self, name: &str, filter: Filter) -> Result<u64, CoreError>;
}
