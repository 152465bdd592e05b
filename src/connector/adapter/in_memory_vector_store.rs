use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::application::interfaces::{
    CollectionInfo, Distance, Filter, FilterCondition, Hit, VectorStore,
};
use crate::domain::{CoreError, Point, SparseVector};

struct Collection {
    vector_size: usize,
    distance: Distance,
    hybrid_enabled: bool,
    points: HashMap<String, Point>,
}

/// In-process `VectorStore` backed by a `HashMap` of collections, for tests
/// and small local runs where standing up a real vector database is
/// unnecessary overhead.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn sparse_dot(query: &SparseVector, candidate: &SparseVector) -> f32 {
    let mut score = 0.0;
    for (idx, value) in query.indices.iter().zip(&query.values) {
        if let Some(pos) = candidate.indices.iter().position(|i| i == idx) {
            score += value * candidate.values[pos];
        }
    }
    score
}

/// Compiles `pattern` as a `globset` glob; an invalid pattern matches
/// nothing rather than panicking or silently falling back to a substring
/// test.
fn glob_matches(pattern: &str, candidate: &str) -> bool {
    match globset::Glob::new(pattern) {
        Ok(glob) => glob.compile_matcher().is_match(candidate),
        Err(e) => {
            tracing::warn!("invalid glob pattern {pattern:?}: {e}");
            false
        }
    }
}

fn condition_matches(condition: &FilterCondition, payload: &Value) -> bool {
    match condition {
        FilterCondition::Match { key, value } => payload.get(key) == Some(value),
        FilterCondition::MatchAny { key, values } => payload
            .get(key)
            .map(|v| values.contains(v))
            .unwrap_or(false),
        FilterCondition::Glob { key, pattern } => payload
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| glob_matches(pattern, s))
            .unwrap_or(false),
        FilterCondition::Range { key, gte, lte } => {
            let Some(actual) = payload.get(key) else {
                return false;
            };
            let within_lower = gte.as_ref().map(|bound| compare_values(actual, bound) >= 0).unwrap_or(true);
            let within_upper = lte.as_ref().map(|bound| compare_values(actual, bound) <= 0).unwrap_or(true);
            within_lower && within_upper
        }
    }
}

/// Orders two JSON scalars; strings compare lexicographically (sufficient
/// for ISO-8601 dates), numbers numerically. Anything else compares equal.
fn compare_values(a: &Value, b: &Value) -> i32 {
    if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
        return a.cmp(b) as i32;
    }
    if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
        return a.partial_cmp(&b).map(|o| o as i32).unwrap_or(0);
    }
    0
}

fn matches_filter(filter: &Filter, payload: &Value) -> bool {
    let must_ok = filter.must.iter().all(|c| condition_matches(c, payload));
    let should_ok = filter.should.is_empty() || filter.should.iter().any(|c| condition_matches(c, payload));
    let must_not_ok = !filter.must_not.iter().any(|c| condition_matches(c, payload));
    must_ok && should_ok && must_not_ok
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
        enable_hybrid: bool,
    ) -> Result<(), CoreError> {
        let mut collections = self.collections.write().expect("vector store lock poisoned");
        collections.insert(
            name.to_string(),
            Collection {
                vector_size,
                distance,
                hybrid_enabled: enable_hybrid,
                points: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, CoreError> {
        let collections = self.collections.read().expect("vector store lock poisoned");
        Ok(collections.contains_key(name))
    }

    async fn get_collection_info(&self, name: &str) -> Result<CollectionInfo, CoreError> {
        let collections = self.collections.read().expect("vector store lock poisoned");
        let collection = collections
            .get(name)
            .ok_or_else(|| CoreError::invalid_filter(format!("collection {name} does not exist")))?;
        Ok(CollectionInfo {
            points_count: collection.points.len() as u64,
            vector_size: collection.vector_size,
            hybrid_enabled: collection.hybrid_enabled,
            distance: collection.distance,
        })
    }

    async fn delete_collection(&self, name: &str) -> Result<(), CoreError> {
        let mut collections = self.collections.write().expect("vector store lock poisoned");
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, name: &str, points: Vec<Point>) -> Result<(), CoreError> {
        let mut collections = self.collections.write().expect("vector store lock poisoned");
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Collection {
                vector_size: points.first().and_then(|p| p.dense_vector.as_ref()).map(|v| v.len()).unwrap_or(0),
                distance: Distance::Cosine,
                hybrid_enabled: false,
                points: HashMap::new(),
            });
        for point in points {
            collection.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn upsert_with_sparse(&self, name: &str, points: Vec<Point>) -> Result<(), CoreError> {
        self.upsert(name, points).await
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<Filter>,
    ) -> Result<Vec<Hit>, CoreError> {
        let collections = self.collections.read().expect("vector store lock poisoned");
        let collection = collections
            .get(name)
            .ok_or_else(|| CoreError::invalid_filter(format!("collection {name} does not exist")))?;

        let mut hits: Vec<Hit> = collection
            .points
            .values()
            .filter(|p| filter.as_ref().map(|f| matches_filter(f, &p.payload)).unwrap_or(true))
            .filter_map(|p| {
                p.dense_vector.as_ref().map(|dense| Hit {
                    point: p.clone(),
                    score: cosine(vector, dense),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn hybrid_search(
        &self,
        name: &str,
        dense_vector: &[f32],
        sparse_vector: &SparseVector,
        limit: usize,
        filter: Option<Filter>,
    ) -> Result<Vec<Hit>, CoreError> {
        let collections = self.collections.read().expect("vector store lock poisoned");
        let collection = collections
            .get(name)
            .ok_or_else(|| CoreError::invalid_filter(format!("collection {name} does not exist")))?;

        if !collection.hybrid_enabled {
            drop(collections);
            return self.search(name, dense_vector, limit, filter).await;
        }

        let mut hits: Vec<Hit> = collection
            .points
            .values()
            .filter(|p| filter.as_ref().map(|f| matches_filter(f, &p.payload)).unwrap_or(true))
            .filter_map(|p| {
                let dense = p.dense_vector.as_ref()?;
                let dense_score = cosine(dense_vector, dense);
                let sparse_score = p
                    .sparse_vector
                    .as_ref()
                    .map(|sv| sparse_dot(sparse_vector, sv))
                    .unwrap_or(0.0);
                Some(Hit {
                    point: p.clone(),
                    score: 0.5 * dense_score + 0.5 * sparse_score,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn get_point(&self, name: &str, id: &str) -> Result<Option<Point>, CoreError> {
        let collections = self.collections.read().expect("vector store lock poisoned");
        Ok(collections.get(name).and_then(|c| c.points.get(id).cloned()))
    }

    async fn delete_points(&self, name: &str, ids: &[String]) -> Result<(), CoreError> {
        let mut collections = self.collections.write().expect("vector store lock poisoned");
        if let Some(collection) = collections.get_mut(name) {
            for id in ids {
                collection.points.remove(id);
            }
        }
        Ok(())
    }

    async fn delete_points_by_filter(&self, name: &str, filter: Filter) -> Result<u64, CoreError> {
        let mut collections = self.collections.write().expect("vector store lock poisoned");
        let Some(collection) = collections.get_mut(name) else {
            return Ok(0);
        };
        let to_remove: Vec<String> = collection
            .points
            .iter()
            .filter(|(_, p)| matches_filter(&filter, &p.payload))
            .map(|(id, _)| id.clone())
            .collect();
        let removed = to_remove.len() as u64;
        for id in to_remove {
            collection.points.remove(&id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: &str, vector: Vec<f32>, payload: Value) -> Point {
        Point::new(id.to_string(), vector, payload)
    }

    #[tokio::test]
    async fn test_create_and_check_collection() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c1", 3, Distance::Cosine, false).await.unwrap();
        assert!(store.collection_exists("c1").await.unwrap());
        assert!(!store.collection_exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_and_search_orders_by_similarity() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c1", 2, Distance::Cosine, false).await.unwrap();
        store
            .upsert(
                "c1",
                vec![
                    point("a", vec![1.0, 0.0], json!({"relative_path": "a.rs"})),
                    point("b", vec![0.0, 1.0], json!({"relative_path": "b.rs"})),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("c1", &[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(hits[0].point.id, "a");
    }

    #[tokio::test]
    async fn test_filter_match_excludes_non_matching() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c1", 2, Distance::Cosine, false).await.unwrap();
        store
            .upsert(
                "c1",
                vec![
                    point("a", vec![1.0, 0.0], json!({"language": "rust"})),
                    point("b", vec![1.0, 0.0], json!({"language": "python"})),
                ],
            )
            .await
            .unwrap();

        let filter = Filter {
            must: vec![FilterCondition::Match {
                key: "language".to_string(),
                value: json!("rust"),
            }],
            should: Vec::new(),
            must_not: Vec::new(),
        };
        let hits = store.search("c1", &[1.0, 0.0], 10, Some(filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].point.id, "a");
    }

    #[tokio::test]
    async fn test_glob_filter_matches_recursive_directory_pattern() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c1", 2, Distance::Cosine, false).await.unwrap();
        store
            .upsert(
                "c1",
                vec![
                    point("a", vec![1.0, 0.0], json!({"relative_path": "src/api/handler.rs"})),
                    point("b", vec![1.0, 0.0], json!({"relative_path": "src/cli/mod.rs"})),
                ],
            )
            .await
            .unwrap();

        let filter = Filter {
            must: vec![FilterCondition::Glob {
                key: "relative_path".to_string(),
                pattern: "src/api/**".to_string(),
            }],
            should: Vec::new(),
            must_not: Vec::new(),
        };
        let hits = store.search("c1", &[1.0, 0.0], 10, Some(filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].point.id, "a");
    }

    #[tokio::test]
    async fn test_delete_points_by_filter_removes_matches() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c1", 2, Distance::Cosine, false).await.unwrap();
        store
            .upsert("c1", vec![point("a", vec![1.0, 0.0], json!({"relative_path": "a.rs"}))])
            .await
            .unwrap();

        let filter = Filter {
            must: vec![FilterCondition::MatchAny {
                key: "relative_path".to_string(),
                values: vec![json!("a.rs")],
            }],
            should: Vec::new(),
            must_not: Vec::new(),
        };
        let removed = store.delete_points_by_filter("c1", filter).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_point("c1", "a").await.unwrap().is_none());
    }
}
