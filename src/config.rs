//! Application configuration: defaults, then environment, then flags

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use docqa_llm::OllamaConfig;
use docqa_rag::{DEFAULT_EMBEDDING_MODEL, PipelineConfig};

pub const DEFAULT_TABLE_PATH: &str = "tmp/docqa.sqlite";
/// The hosted embedder has its own dimensionality, so it gets its own file
pub const DEFAULT_AGENT_TABLE_PATH: &str = "tmp/docqa-agent.sqlite";

/// Standing instructions for the hosted agent
pub const AGENT_INSTRUCTIONS: [&str; 4] = [
    "Read and understand all documents in the knowledge base",
    "Provide concise summaries when asked",
    "Answer questions based on the document contents",
    "If information is not found in documents, say so clearly",
];
pub const AGENT_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub documents_dir: Option<PathBuf>,
    pub table_path: PathBuf,
    pub agent_table_path: PathBuf,
    pub embedding_model: String,
    pub model_cache: Option<PathBuf>,
    pub ollama: OllamaConfig,
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            documents_dir: None,
            table_path: PathBuf::from(DEFAULT_TABLE_PATH),
            agent_table_path: PathBuf::from(DEFAULT_AGENT_TABLE_PATH),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            model_cache: None,
            ollama: OllamaConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let mut pipeline = defaults.pipeline;
        if let Some(top_k) = lookup("DOCQA_TOP_K").and_then(|v| v.parse().ok()) {
            pipeline.top_k = top_k;
        }
        if let Some(budget) = lookup("DOCQA_SUMMARY_BUDGET").and_then(|v| v.parse().ok()) {
            pipeline.summary_budget_chars = budget;
        }

        Self {
            documents_dir: lookup("DOCQA_DOCUMENTS_DIR").map(PathBuf::from),
            table_path: lookup("DOCQA_TABLE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.table_path),
            agent_table_path: lookup("DOCQA_AGENT_TABLE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.agent_table_path),
            embedding_model: lookup("DOCQA_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            model_cache: lookup("DOCQA_MODEL_CACHE").map(PathBuf::from),
            ollama: OllamaConfig::from_lookup(&lookup),
            pipeline,
        }
    }

    /// Pipeline settings for the hosted agent: wider retrieval plus instructions
    pub fn agent_pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            top_k: AGENT_TOP_K,
            instructions: Some(AGENT_INSTRUCTIONS.join("\n")),
            ..self.pipeline.clone()
        }
    }
}
