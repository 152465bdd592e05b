use async_trait::async_trait;

use crate::domain::CoreError;

/// One embedded text plus the dimensionality it was produced at.
#[derive(Debug, Clone)]
pub struct EmbeddedText {
    pub vector: Vec<f32>,
    pub dimensions: usize,
}

/// The embedding capability consumed by the indexers and retriever.
/// Hosting the model itself is out of scope; this is the interface an
/// adapter wraps around a local or remote embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<EmbeddedText, CoreError>;

    /// Returns one result per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddedText>, CoreError>;
}
