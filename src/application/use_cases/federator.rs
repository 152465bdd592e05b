use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use futures_util::future::join_all;

use crate::domain::{CoreError, ResultType, SearchResult};

pub const RRF_K: f32 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Code,
    Git,
    Both,
}

impl SearchType {
    fn result_types(self) -> Vec<ResultType> {
        match self {
            SearchType::Code => vec![ResultType::Code],
            SearchType::Git => vec![ResultType::Commit],
            SearchType::Both => vec![ResultType::Code, ResultType::Commit],
        }
    }
}

/// Min-max normalization to `[0,1]`. A single value normalizes to `1.0`;
/// an all-equal set also normalizes to `1.0` for every element.
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    if scores.len() == 1 {
        return vec![1.0];
    }

    let min = scores.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

    if (max - min).abs() < f32::EPSILON {
        return vec![1.0; scores.len()];
    }

    scores.iter().map(|&s| (s - min) / (max - min)).collect()
}

/// `1 / (k + rank)`, `rank` starting at 1. Monotone decreasing in rank.
pub fn rrf_score(rank: usize) -> f32 {
    1.0 / (RRF_K + rank as f32)
}

type BoxedSearchFuture =
    Pin<Box<dyn Future<Output = Result<Vec<SearchResult>, CoreError>> + Send>>;

/// Fans out to `paths × result_types`, normalizes scores within each
/// `(repoPath, resultType)` group, fuses via RRF, and returns the global
/// top `limit` (spec §4.12). `search` is invoked once per `(path, type)`
/// with `ceil(limit / paths.len())` as the requested per-leg count.
pub async fn federate<F>(
    paths: &[String],
    search_type: SearchType,
    limit: usize,
    mut search: F,
) -> Result<Vec<SearchResult>, CoreError>
where
    F: FnMut(&str, ResultType, usize) -> BoxedSearchFuture,
{
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    let per_leg_limit = limit.div_ceil(paths.len()).max(1);
    let result_types = search_type.result_types();

    let mut futures = Vec::new();
    for path in paths {
        for &rt in &result_types {
            futures.push(search(path, rt, per_leg_limit));
        }
    }

    let legs = join_all(futures).await;
    let mut by_group: HashMap<(String, ResultType), Vec<SearchResult>> = HashMap::new();

    for leg in legs {
        let results = leg?;
        for result in results {
            by_group
                .entry((result.repo_path().to_string(), result.result_type()))
                .or_default()
                .push(result);
        }
    }

    let mut fused = Vec::new();
    for (_, mut group) in by_group {
        group.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(std::cmp::Ordering::Equal));
        let scores: Vec<f32> = group.iter().map(|r| r.score()).collect();
        let normalized = normalize_scores(&scores);

        for (rank0, (result, _norm)) in group.into_iter().zip(normalized).enumerate() {
            let rank = rank0 + 1;
            let rrf = rrf_score(rank);
            fused.push(result.with_score(rrf));
        }
    }

    fused.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(limit);
    Ok(fused)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_singleton() {
        assert_eq!(normalize_scores(&[0.42]), vec![1.0]);
    }

    #[test]
    fn test_normalize_all_equal() {
        assert_eq!(normalize_scores(&[0.5, 0.5, 0.5]), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_normalize_spreads_to_zero_one() {
        let normalized = normalize_scores(&[0.1, 0.5, 0.9]);
        assert!((normalized[0] - 0.0).abs() < 1e-6);
        assert!((normalized[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_monotone_decreasing() {
        assert!(rrf_score(1) > rrf_score(2));
        assert!(rrf_score(2) > rrf_score(3));
    }

    #[test]
    fn test_rrf_formula() {
        assert!((rrf_score(1) - 1.0 / 61.0).abs() < 1e-6);
        assert!((rrf_score(2) - 1.0 / 62.0).abs() < 1e-6);
        assert!((rrf_score(3) - 1.0 / 63.0).abs() < 1e-6);
    }
}
