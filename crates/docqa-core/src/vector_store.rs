//! Vector store trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{EmbeddingRecord, Error, Result, SearchHit};

/// Configuration for vector search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    /// Drop hits farther than this squared L2 distance
    pub max_distance: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 1,
            max_distance: None,
        }
    }
}

impl SearchConfig {
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Default::default()
        }
    }
}

/// Trait for vector tables
///
/// A table has a fixed schema (vector of known dimensionality, text,
/// source). It is recreated wholesale on every ingestion run and only
/// ever appended to afterwards.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the table, dropping any previous one
    async fn create_table(&self, dimensions: usize) -> Result<()>;

    /// Append records; every vector must match the schema dimensionality
    async fn insert(&self, records: Vec<EmbeddingRecord>) -> Result<usize>;

    /// Nearest neighbours of `vector`, closest first
    async fn search(&self, vector: &[f32], config: &SearchConfig) -> Result<Vec<SearchHit>>;

    /// All stored texts in insertion order
    async fn texts(&self) -> Result<Vec<String>>;

    /// Get the total number of records
    async fn count(&self) -> Result<usize>;

    /// Schema dimensionality, `None` until a table exists
    fn dimensions(&self) -> Option<usize>;
}

/// Reject a vector whose length differs from the table schema
pub fn check_dimensions(expected: Option<usize>, vector: &[f32]) -> Result<usize> {
    let expected =
        expected.ok_or_else(|| Error::VectorStore("Table has not been created".to_string()))?;
    if vector.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(expected)
}

/// Squared Euclidean distance
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Sort candidates by distance, apply the distance cut-off and keep `top_k`
pub fn rank_hits(mut hits: Vec<SearchHit>, config: &SearchConfig) -> Vec<SearchHit> {
    if let Some(max) = config.max_distance {
        hits.retain(|hit| hit.distance <= max);
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(config.top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str, distance: f32) -> SearchHit {
        SearchHit {
            text: text.to_string(),
            source: None,
            distance,
        }
    }

    #[test]
    fn test_squared_l2() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_l2(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_check_dimensions() {
        assert_eq!(check_dimensions(Some(3), &[1.0, 2.0, 3.0]).unwrap(), 3);
        assert!(matches!(
            check_dimensions(Some(3), &[1.0]),
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
        assert!(matches!(
            check_dimensions(None, &[1.0]),
            Err(Error::VectorStore(_))
        ));
    }

    #[test]
    fn test_rank_hits_default_is_top_one() {
        let hits = vec![hit("far", 4.0), hit("near", 0.5), hit("mid", 1.0)];
        let ranked = rank_hits(hits, &SearchConfig::default());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].text, "near");
    }

    #[test]
    fn test_rank_hits_max_distance() {
        let hits = vec![hit("far", 4.0), hit("near", 0.5), hit("mid", 1.0)];
        let config = SearchConfig {
            top_k: 5,
            max_distance: Some(1.0),
        };
        let ranked = rank_hits(hits, &config);
        let texts: Vec<_> = ranked.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "mid"]);
    }
}
