//! Hosted chat and embedding models behind an OpenAI-compatible API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use docqa_core::{Embedder, Error, GenerationConfig, GenerationResult, LLMProvider, Result};

use crate::config::OpenAIConfig;

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

pub(crate) fn chat_request<'a>(
    model: &'a str,
    prompt: &'a str,
    config: &'a GenerationConfig,
) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if let Some(instructions) = config.instructions.as_deref() {
        messages.push(ChatMessage {
            role: "system",
            content: instructions,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: prompt,
    });

    ChatRequest {
        model,
        messages,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
    }
}

impl ChatResponse {
    pub(crate) fn into_text(self) -> Result<(String, Option<u32>)> {
        let tokens = self.usage.map(|u| u.total_tokens);
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::LLMProvider("Response contained no message".to_string()))?;
        Ok((text.trim().to_string(), tokens))
    }
}

impl EmbeddingResponse {
    /// Vectors in input order
    pub(crate) fn into_vectors(mut self, expected: usize) -> Result<Vec<Vec<f32>>> {
        if self.data.len() != expected {
            return Err(Error::Embedding(format!(
                "Requested {} embeddings, received {}",
                expected,
                self.data.len()
            )));
        }
        self.data.sort_by_key(|d| d.index);
        Ok(self.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Shared HTTP plumbing for the hosted chat and embedding clients
#[derive(Clone)]
struct ApiClient {
    config: OpenAIConfig,
    client: Client,
}

impl ApiClient {
    fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.config.endpoint(path))
            .bearer_auth(&self.config.api_key)
    }

    fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> RequestBuilder {
        self.client
            .post(self.config.endpoint(path))
            .bearer_auth(&self.config.api_key)
            .json(body)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::Authentication(format!("API key rejected ({}): {}", status, error_text))
            }
            _ => Error::LLMProvider(format!(
                "API request failed with status {}: {}",
                status, error_text
            )),
        })
    }
}

/// Chat client for an OpenAI-compatible endpoint
pub struct OpenAIClient {
    api: ApiClient,
    generation: GenerationConfig,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            generation: GenerationConfig::default(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env()?)
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    async fn perform_generation(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<ChatResponse> {
        let body = chat_request(&self.api.config.chat_model, prompt, config);
        self.api
            .send(self.api.post("chat/completions", &body))
            .await?
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn connect(&mut self) -> Result<()> {
        self.api.send(self.api.get("models")).await?;
        tracing::debug!(model = %self.api.config.chat_model, "Connected to hosted API");
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
        let response = match timeout(config.timeout, self.perform_generation(prompt, config)).await
        {
            Ok(result) => result?,
            Err(_) => return Err(Error::Timeout("Request timed out".to_string())),
        };
        let (text, tokens_used) = response.into_text()?;

        Ok(GenerationResult {
            text,
            model_id: self.api.config.chat_model.clone(),
            tokens_used,
        })
    }

    fn model_id(&self) -> &str {
        &self.api.config.chat_model
    }
}

/// Embedding client for an OpenAI-compatible endpoint
pub struct OpenAIEmbedder {
    api: ApiClient,
}

impl OpenAIEmbedder {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env()?)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.api.config.embedding_model,
            input: texts,
        };
        let response = self
            .api
            .send(self.api.post("embeddings", &body))
            .await?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let vectors = response.into_vectors(texts.len())?;
        if let Some(bad) = vectors
            .iter()
            .find(|v| v.len() != self.api.config.embedding_dimensions)
        {
            return Err(Error::DimensionMismatch {
                expected: self.api.config.embedding_dimensions,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.api.config.embedding_dimensions
    }

    fn model_id(&self) -> &str {
        &self.api.config.embedding_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_puts_instructions_first() {
        let config = GenerationConfig::default()
            .with_max_tokens(50)
            .with_instructions("Answer from the documents");
        let body = serde_json::to_value(chat_request("gpt-4o-mini", "Hello!", &config)).unwrap();

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hello!");
        assert_eq!(body["max_tokens"], 50);
    }

    #[test]
    fn test_chat_request_without_instructions() {
        let config = GenerationConfig::default();
        let request = chat_request("gpt-4o-mini", "Hello!", &config);
        assert_eq!(
            request.messages,
            vec![ChatMessage {
                role: "user",
                content: "Hello!"
            }]
        );
    }

    #[test]
    fn test_chat_response_text() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":" Octopuses have three hearts. "}}],
                "usage":{"prompt_tokens":12,"completion_tokens":8,"total_tokens":20}}"#,
        )
        .unwrap();
        let (text, tokens) = response.into_text().unwrap();
        assert_eq!(text, "Octopuses have three hearts.");
        assert_eq!(tokens, Some(20));

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(empty.into_text(), Err(Error::LLMProvider(_))));
    }

    #[test]
    fn test_embedding_response_restores_input_order() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.5,0.5]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .unwrap();
        let vectors = response.into_vectors(2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn test_embedding_response_count_mismatch() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#).unwrap();
        assert!(matches!(response.into_vectors(3), Err(Error::Embedding(_))));
    }
}
