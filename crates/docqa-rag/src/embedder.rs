//! Local sentence embeddings with fastembed

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Mutex;

use docqa_core::{Embedder, Error, Result};

pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Model names accepted by [`FastEmbedder::new`] and their output size
pub fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    let short = name
        .strip_prefix("sentence-transformers/")
        .or_else(|| name.strip_prefix("BAAI/"))
        .unwrap_or(name)
        .to_ascii_lowercase();

    let resolved = match short.as_str() {
        "all-minilm-l6-v2" => (EmbeddingModel::AllMiniLML6V2, 384),
        "all-minilm-l12-v2" => (EmbeddingModel::AllMiniLML12V2, 384),
        "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
        "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
        "bge-large-en-v1.5" => (EmbeddingModel::BGELargeENV15, 1024),
        _ => {
            return Err(Error::Configuration(format!(
                "Unsupported embedding model '{}'",
                name
            )));
        }
    };
    Ok(resolved)
}

/// Sentence-embedding model running in-process
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
    model_id: String,
    dimensions: usize,
}

impl FastEmbedder {
    /// Load (downloading on first use) the named model
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self> {
        let (model, dimensions) = resolve_model(model_name)?;

        let mut options = InitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let model = TextEmbedding::try_new(options)
            .map_err(|e| Error::Embedding(format!("Failed to load {}: {}", model_name, e)))?;
        tracing::debug!(model = %model_name, dimensions, "Loaded embedding model");

        Ok(Self {
            model: Mutex::new(model),
            model_id: model_name.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut model = self
            .model
            .lock()
            .map_err(|_| Error::Embedding("Embedding model lock poisoned".to_string()))?;
        let vectors = model
            .embed(texts.to_vec(), None)
            .map_err(|e| Error::Embedding(e.to_string()))?;

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_names() {
        assert_eq!(resolve_model("all-MiniLM-L6-v2").unwrap().1, 384);
        assert_eq!(
            resolve_model("sentence-transformers/all-MiniLM-L6-v2").unwrap().1,
            384
        );
        assert_eq!(resolve_model("BAAI/bge-large-en-v1.5").unwrap().1, 1024);
        assert!(matches!(
            resolve_model("word2vec"),
            Err(Error::Configuration(_))
        ));
    }
}
