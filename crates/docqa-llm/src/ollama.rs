//! Local generation through an Ollama server

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::timeout;

use docqa_core::{Error, GenerationConfig, GenerationResult, LLMProvider, Result};

use crate::config::OllamaConfig;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid think-block pattern"));

const THINK_OPEN: &str = "<think>";

/// Remove reasoning blocks emitted by models such as DeepSeek R1
///
/// An unterminated block means the model ran out of tokens while thinking.
/// Text before it wins; otherwise the partial reasoning is the reply. A
/// reply that is nothing but reasoning is an error rather than a blank
/// answer.
pub fn strip_reasoning(text: &str) -> Result<String> {
    let stripped = THINK_BLOCK.replace_all(text, "");
    let answer = match stripped.find(THINK_OPEN) {
        Some(pos) => {
            let before = stripped[..pos].trim();
            if before.is_empty() {
                stripped[pos + THINK_OPEN.len()..].trim()
            } else {
                before
            }
        }
        None => stripped.trim(),
    };

    if answer.is_empty() && text.contains(THINK_OPEN) {
        return Err(Error::LLMProvider(
            "model exhausted max_tokens while reasoning".to_string(),
        ));
    }
    Ok(answer.to_string())
}

/// Ollama client
pub struct OllamaClient {
    config: OllamaConfig,
    generation: GenerationConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
    num_ctx: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            config,
            generation: GenerationConfig::default(),
            client,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OllamaConfig::from_env())
    }

    /// Replace the default generation parameters
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// The generation deadline never undercuts the configured server timeout
    pub(crate) fn effective_timeout(&self, config: &GenerationConfig) -> Duration {
        config.timeout.max(self.config.timeout())
    }

    pub(crate) fn build_request<'a>(
        &'a self,
        prompt: &'a str,
        config: &'a GenerationConfig,
    ) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.model,
            prompt,
            system: config.instructions.as_deref(),
            stream: false,
            options: GenerateOptions {
                temperature: config.temperature,
                top_p: config.top_p,
                num_predict: config.max_tokens,
                num_ctx: config.context_window,
            },
        }
    }

    async fn perform_generation(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerateResponse> {
        let url = format!("{}/api/generate", self.config.base_url.trim_end_matches('/'));
        let request = self.build_request(prompt, config);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::LLMProvider(format!(
                "Ollama request failed with status {}: {}",
                status, error_text
            )));
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn connect(&mut self) -> Result<()> {
        let url = format!("{}/api/tags", self.config.base_url.trim_end_matches('/'));

        let response = self.client.get(&url).send().await.map_err(|e| {
            Error::Configuration(format!(
                "Cannot reach Ollama at {}: {}",
                self.config.base_url, e
            ))
        })?;

        if !response.status().is_success() {
            return Err(Error::Configuration(format!(
                "Ollama at {} answered {}",
                self.config.base_url,
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let wanted = &self.config.model;
        let available = tags
            .models
            .iter()
            .any(|m| m.name == *wanted || m.name.strip_suffix(":latest") == Some(wanted.as_str()));
        if !available {
            return Err(Error::Configuration(format!(
                "Model '{}' is not available in Ollama; run `ollama pull {}`",
                wanted, wanted
            )));
        }

        tracing::debug!(model = %wanted, "Connected to Ollama");
        Ok(())
    }

    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        self.generate_with_config(prompt, &self.generation).await
    }

    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let deadline = self.effective_timeout(config);
        let response = match timeout(deadline, self.perform_generation(prompt, config)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Timeout(format!(
                    "Request timed out after {}s",
                    deadline.as_secs()
                )));
            }
        };

        Ok(GenerationResult {
            text: strip_reasoning(&response.response)?,
            model_id: self.config.model.clone(),
            tokens_used: response.eval_count,
        })
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
