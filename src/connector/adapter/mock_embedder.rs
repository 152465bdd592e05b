use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::application::interfaces::{EmbeddedText, Embedder};
use crate::domain::CoreError;

/// Deterministic, model-free `Embedder` for tests and offline demos: seeds an
/// RNG from the text's hash and L2-normalizes the result, so the same input
/// always produces the same vector without hosting a real model.
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut vector: Vec<f32> = (0..self.dimensions)
            .map(|_| rng.gen_range(-1.0f32..1.0f32))
            .collect();

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<EmbeddedText, CoreError> {
        Ok(EmbeddedText {
            vector: self.embed_one(text),
            dimensions: self.dimensions,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddedText>, CoreError> {
        Ok(texts
            .iter()
            .map(|text| EmbeddedText {
                vector: self.embed_one(text),
                dimensions: self.dimensions,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_text_same_vector() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed("hello world").await.unwrap();
        let b = embedder.embed("hello world").await.unwrap();
        assert_eq!(a.vector, b.vector);
    }

    #[tokio::test]
    async fn test_different_text_different_vector() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed("hello").await.unwrap();
        let b = embedder.embed("world").await.unwrap();
        assert_ne!(a.vector, b.vector);
    }

    #[tokio::test]
    async fn test_vector_is_l2_normalized() {
        let embedder = MockEmbedder::new(32);
        let embedded = embedder.embed("normalize me").await.unwrap();
        let norm: f32 = embedded.vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_embed_batch_matches_embed() {
        let embedder = MockEmbedder::new(8);
        let batch = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        let single_a = embedder.embed("a").await.unwrap();
        assert_eq!(batch[0].vector, single_a.vector);
    }

    #[test]
    fn test_dimensions_reported() {
        let embedder = MockEmbedder::new(64);
        assert_eq!(embedder.dimensions(), 64);
    }
}
