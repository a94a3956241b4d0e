//! Core traits and types for docqa
//!
//! This crate defines the fundamental traits and types used across the docqa system.
//! It provides capability-facing interfaces for LLM providers, embedders and vector
//! stores, making the pipeline test-friendly and backend-agnostic.

pub mod embedder;
pub mod error;
pub mod llm;
pub mod types;
pub mod vector_store;


pub use embedder::Embedder;
pub use error::{Error, Result};
pub use llm::{GenerationConfig, GenerationResult, LLMProvider};
pub use types::*;
pub use vector_store::{SearchConfig, VectorStore};
