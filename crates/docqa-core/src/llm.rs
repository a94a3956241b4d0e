//! LLM provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Result;

/// Configuration for text generation
///
/// Sampling parameters stay fixed for a whole run; only `max_tokens`
/// differs between the summary and question-answering calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Context length requested from the model, in tokens
    pub context_window: u32,
    /// System-level instructions sent ahead of the prompt
    pub instructions: Option<String>,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            temperature: 0.7,
            top_p: 0.9,
            context_window: 2048,
            instructions: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl GenerationConfig {
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// Result of a text generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model_id: String,
    pub tokens_used: Option<u32>,
}

/// Trait for LLM providers (local Ollama, hosted OpenAI-compatible APIs)
///
/// Implementations wrap a single model with fixed sampling parameters
/// and expose "generate(prompt, max_tokens) -> text".
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Check that the provider is reachable and the credentials are accepted
    async fn connect(&mut self) -> Result<()>;

    /// Generate text using the provider's default configuration
    async fn generate(&self, prompt: &str) -> Result<GenerationResult>;

    /// Generate text with custom configuration
    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
