//! Embedder trait

use async_trait::async_trait;

use crate::{Error, Result};

/// Trait for text embedding models
///
/// One model serves both indexing and query-time vectorisation, so the
/// vectors it returns always share `dimensions()`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a list of texts in a single model call
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed one text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Empty embedding result".to_string()))
    }

    /// Length of every vector this model produces
    fn dimensions(&self) -> usize;

    /// Name of the underlying model
    fn model_id(&self) -> &str;
}
