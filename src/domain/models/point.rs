use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::sparse_vector::SparseVector;

/// A single vector-store record: an id, optional dense/sparse vectors, and an
/// arbitrary JSON payload carrying the chunk or commit metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub dense_vector: Option<Vec<f32>>,
    pub sparse_vector: Option<SparseVector>,
    pub payload: Value,
}

impl Point {
    pub fn new(id: String, dense_vector: Vec<f32>, payload: Value) -> Self {
        Self {
            id,
            dense_vector: Some(dense_vector),
            sparse_vector: None,
            payload,
        }
    }

    pub fn with_sparse_vector(mut self, sparse: SparseVector) -> Self {
        self.sparse_vector = Some(sparse);
        self
    }
}

/// Reserved point id for the best-effort per-collection indexing marker.
/// It is never returned by search because it carries no chunk payload shape
/// any retriever filter would match.
pub const INDEXING_MARKER_ID: &str = "__indexing_marker__";

/// Status recorded in the indexing marker point's payload, used for
/// external mutual exclusion between concurrent indexing runs against the
/// same collection. The marker is best-effort, not a lock: a crashed process
/// leaves it in place as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingStatus {
    InProgress,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingMarker {
    pub status: IndexingStatus,
    pub started_at: String,
    pub updated_at: String,
}

impl IndexingMarker {
    pub fn to_point(&self) -> Point {
        Point {
            id: INDEXING_MARKER_ID.to_string(),
            dense_vector: None,
            sparse_vector: None,
            payload: serde_json::to_value(self).unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_round_trips_through_point() {
        let marker = IndexingMarker {
            status: IndexingStatus::InProgress,
            started_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let point = marker.to_point();
        assert_eq!(point.id, INDEXING_MARKER_ID);
        let restored: IndexingMarker = serde_json::from_value(point.payload).unwrap();
        assert_eq!(restored.status, IndexingStatus::InProgress);
    }
}
