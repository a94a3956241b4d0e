//! Model clients for docqa
//!
//! [`OllamaClient`] runs generation against a local Ollama server.
//! [`OpenAIClient`] and [`OpenAIEmbedder`] talk to any OpenAI-compatible
//! hosted API.

pub mod config;
pub mod ollama;
pub mod openai;

pub use config::{OllamaConfig, OpenAIConfig};
pub use ollama::{OllamaClient, strip_reasoning};
pub use openai::{OpenAIClient, OpenAIEmbedder};
