use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::application::interfaces::{Embedder, Filter, FilterCondition, VectorStore};
use crate::domain::{CoreError, SearchQuery};

use super::sparse_encoder::SparseEncoder;

/// Executes dense / hybrid search against one collection: builds the
/// filter, embeds the query, and falls back from hybrid to dense-only when
/// the collection lacks sparse configuration.
pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
        }
    }

    pub async fn search(
        &self,
        collection: &str,
        query: &SearchQuery,
    ) -> Result<Vec<crate::application::interfaces::Hit>, CoreError> {
        info!("searching {} for: {}", collection, query.query());
        let start = Instant::now();

        let filter = build_filter(query);
        let embedded = self.embedder.embed(query.query()).await?;

        let results = if query.is_hybrid() {
            let info = self.vector_store.get_collection_info(collection).await?;
            if info.hybrid_enabled {
                let mut encoder = SparseEncoder::default();
                let sparse = encoder.generate(query.query(), None);
                self.vector_store
                    .hybrid_search(collection, &embedded.vector, &sparse, query.limit(), filter)
                    .await?
            } else {
                debug!("collection {} lacks sparse config, falling back to dense", collection);
                self.vector_store
                    .search(collection, &embedded.vector, query.limit(), filter)
                    .await?
            }
        } else {
            self.vector_store
                .search(collection, &embedded.vector, query.limit(), filter)
                .await?
        };

        let results: Vec<_> = results
            .into_iter()
            .filter(|hit| query.min_score().map_or(true, |min| hit.score >= min))
            .collect();

        info!(
            "found {} results in {:.2}s",
            results.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(results)
    }
}

/// Rewrites query filters into the store's filter language, per spec §4.11.
/// An empty query (no filters set at all) returns `None`.
fn build_filter(query: &SearchQuery) -> Option<Filter> {
    let mut must = Vec::new();

    if let Some(languages) = query.languages() {
        if languages.len() == 1 {
            must.push(FilterCondition::Match {
                key: "language".to_string(),
                value: serde_json::Value::String(languages[0].clone()),
            });
        } else if !languages.is_empty() {
            must.push(FilterCondition::MatchAny {
                key: "language".to_string(),
                values: languages
                    .iter()
                    .map(|l| serde_json::Value::String(l.clone()))
                    .collect(),
            });
        }
    }

    if let Some(repos) = query.repository_ids() {
        if !repos.is_empty() {
            must.push(FilterCondition::MatchAny {
                key: "repo_path".to_string(),
                values: repos.iter().map(|r| serde_json::Value::String(r.clone())).collect(),
            });
        }
    }

    if let Some(pattern) = query.path_pattern() {
        must.push(FilterCondition::Glob {
            key: "relative_path".to_string(),
            pattern: pattern.to_string(),
        });
    }

    if must.is_empty() {
        None
    } else {
        Some(Filter {
            must,
            should: Vec::new(),
            must_not: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_empty_query_has_no_filter() {
        let query = SearchQuery::new("anything");
        assert!(build_filter(&query).is_none());
    }

    #[test]
    fn test_build_filter_single_language() {
        let query = SearchQuery::new("x").with_languages(vec!["rust".to_string()]);
        let filter = build_filter(&query).unwrap();
        assert_eq!(filter.must.len(), 1);
    }
}
