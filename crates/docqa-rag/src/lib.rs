//! Retrieval pipeline for docqa
//!
//! Local embeddings ([`FastEmbedder`]), vector tables
//! ([`SqliteVectorTable`], [`MemoryVectorTable`]) and the
//! [`DocumentPipeline`] tying them to an LLM provider.

pub mod embedder;
pub mod pipeline;
pub mod vector_table;

#[cfg(test)]
mod tests;

pub use embedder::{DEFAULT_EMBEDDING_MODEL, FastEmbedder};
pub use pipeline::{DocumentPipeline, NO_CONTEXT, PipelineConfig, ingest_directory};
pub use vector_table::{MemoryVectorTable, SqliteVectorTable};
