//! Model client configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use docqa_core::{Error, Result};

/// Configuration for the local Ollama server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "deepseek-r1:8b".to_string(),
            timeout_secs: 300,
        }
    }
}

impl OllamaConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from any key lookup, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("OLLAMA_BASE_URL").unwrap_or(defaults.base_url),
            model: lookup("OLLAMA_MODEL").unwrap_or(defaults.model),
            timeout_secs: lookup("OLLAMA_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for an OpenAI-compatible hosted API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
}

impl OpenAIConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_CHAT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_EMBEDDING_MODEL: &'static str = "text-embedding-3-small";

    /// Create configuration from environment variables
    ///
    /// A missing `OPENAI_API_KEY` is a configuration error.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration("OPENAI_API_KEY environment variable not set".to_string())
            })?;

        let embedding_model = lookup("OPENAI_EMBEDDING_MODEL")
            .unwrap_or_else(|| Self::DEFAULT_EMBEDDING_MODEL.to_string());

        let embedding_dimensions = match lookup("OPENAI_EMBEDDING_DIMENSIONS") {
            Some(value) => value.parse().map_err(|_| {
                Error::Configuration(format!(
                    "OPENAI_EMBEDDING_DIMENSIONS must be a positive integer, got '{}'",
                    value
                ))
            })?,
            None => known_embedding_dimensions(&embedding_model).ok_or_else(|| {
                Error::Configuration(format!(
                    "Unknown dimensionality for embedding model '{}'; set OPENAI_EMBEDDING_DIMENSIONS",
                    embedding_model
                ))
            })?,
        };

        Ok(Self {
            api_key,
            base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            chat_model: lookup("OPENAI_CHAT_MODEL")
                .unwrap_or_else(|| Self::DEFAULT_CHAT_MODEL.to_string()),
            embedding_model,
            embedding_dimensions,
        })
    }

    /// Create configuration with explicit values
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            chat_model: Self::DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: Self::DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: 1536,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn known_embedding_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let err = OpenAIConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = OpenAIConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_openai_defaults() {
        let config = OpenAIConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.embedding_dimensions, 1536);
        assert_eq!(
            config.endpoint("chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_unknown_embedding_model_needs_dimensions() {
        let err = OpenAIConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_EMBEDDING_MODEL", "custom-embedder"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let config = OpenAIConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_EMBEDDING_MODEL", "custom-embedder"),
            ("OPENAI_EMBEDDING_DIMENSIONS", "768"),
            ("OPENAI_BASE_URL", "http://localhost:8000/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.embedding_dimensions, 768);
        assert_eq!(config.endpoint("embeddings"), "http://localhost:8000/v1/embeddings");
    }

    #[test]
    fn test_ollama_from_lookup() {
        let config = OllamaConfig::from_lookup(lookup(&[
            ("OLLAMA_MODEL", "llama3.2"),
            ("OLLAMA_TIMEOUT_SECS", "not-a-number"),
        ]));
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.base_url, "http://localhost:11434");
        assert_eq!(config.timeout_secs, 300);
    }
}
