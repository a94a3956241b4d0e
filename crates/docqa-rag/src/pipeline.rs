//! Ingestion, summary and question answering over a document folder

use serde::{Deserialize, Serialize};
use std::path::Path;

use docqa_core::{
    Document, Embedder, EmbeddingRecord, Error, FileFailure, GenerationConfig, IngestReport,
    LLMProvider, Result, SearchConfig, SearchHit, VectorStore,
};
use docqa_extract::{Extractor, list_files};

pub const SUMMARY_PREAMBLE: &str = "You are an AI assistant tasked with summarizing documents. Summarize the following content:\n";
pub const NO_CONTEXT: &str = "No relevant information found in the documents.";

/// Tunables for a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Neighbours used as answer context
    pub top_k: usize,
    pub max_distance: Option<f32>,
    /// Upper bound on the summary prompt, in characters
    pub summary_budget_chars: usize,
    pub max_tokens: u32,
    /// Standing instructions sent with every generation
    pub instructions: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 1,
            max_distance: None,
            summary_budget_chars: 6000,
            max_tokens: 200,
            instructions: None,
        }
    }
}

impl PipelineConfig {
    /// Reject settings that cannot produce a usable prompt
    pub fn validate(&self) -> Result<()> {
        let preamble = SUMMARY_PREAMBLE.chars().count();
        if self.summary_budget_chars < preamble {
            return Err(Error::Configuration(format!(
                "Summary budget of {} characters is smaller than the {}-character summary preamble",
                self.summary_budget_chars, preamble
            )));
        }
        Ok(())
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            top_k: self.top_k,
            max_distance: self.max_distance,
        }
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the summary prompt for `texts`, capped at `budget` characters
///
/// The preamble is always whole; only document text is cut.
pub fn summary_prompt(texts: &[String], budget: usize) -> String {
    let remaining = budget.saturating_sub(SUMMARY_PREAMBLE.chars().count());
    let body = texts.join("\n");
    let mut prompt = SUMMARY_PREAMBLE.to_string();
    prompt.push_str(truncate_chars(&body, remaining));
    prompt
}

/// Rebuild `store` from every file directly inside `dir`
///
/// A file that cannot be extracted, embedded or stored is logged and
/// counted; the batch carries on. Only configuration-level errors
/// (missing folder, rejected credentials) abort the run.
pub async fn ingest_directory<E, V>(
    extractor: &Extractor,
    embedder: &E,
    store: &V,
    dir: &Path,
) -> Result<IngestReport>
where
    E: Embedder,
    V: VectorStore,
{
    let files = list_files(dir)?;
    store.create_table(embedder.dimensions()).await?;

    let mut report = IngestReport::default();
    for path in files {
        match ingest_file(extractor, embedder, store, &path).await {
            Ok(()) => {
                tracing::info!("Text extracted {}", path.display());
                report.record_success();
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping document");
                report.record_failure(FileFailure::new(&path, &e));
            }
        }
    }

    tracing::debug!(
        succeeded = report.succeeded,
        failed = report.failed,
        "Ingestion finished"
    );
    Ok(report)
}

async fn ingest_file<E, V>(extractor: &Extractor, embedder: &E, store: &V, path: &Path) -> Result<()>
where
    E: Embedder,
    V: VectorStore,
{
    let extracted = extractor.extract(path)?;
    let document = Document::new(path, extracted.corpus_text());
    let vector = embedder.embed_one(&document.text).await?;
    store
        .insert(vec![EmbeddingRecord::from_document(document, vector)])
        .await?;
    Ok(())
}

/// Build the question prompt around retrieved context
pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an AI assistant. Based on the following context from documents:\n'{}'\nAnswer this question: {}",
        context, question
    )
}

/// Extract, embed, store and query a folder of documents
pub struct DocumentPipeline<E, V, L> {
    embedder: E,
    store: V,
    llm: L,
    extractor: Extractor,
    config: PipelineConfig,
}

impl<E: Embedder, V: VectorStore, L: LLMProvider> DocumentPipeline<E, V, L> {
    pub fn new(embedder: E, store: V, llm: L, config: PipelineConfig) -> Self {
        Self {
            embedder,
            store,
            llm,
            extractor: Extractor::default(),
            config,
        }
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &V {
        &self.store
    }

    pub fn llm(&self) -> &L {
        &self.llm
    }

    /// Check the generation backend before any work starts
    pub async fn connect(&mut self) -> Result<()> {
        self.llm.connect().await
    }

    fn generation_config(&self) -> GenerationConfig {
        let config = GenerationConfig::default().with_max_tokens(self.config.max_tokens);
        match &self.config.instructions {
            Some(instructions) => config.with_instructions(instructions.clone()),
            None => config,
        }
    }

    /// Rebuild the vector table from every file directly inside `dir`
    pub async fn ingest(&self, dir: &Path) -> Result<IngestReport> {
        ingest_directory(&self.extractor, &self.embedder, &self.store, dir).await
    }

    /// Summarise everything in the table
    pub async fn summarize(&self) -> Result<String> {
        self.config.validate()?;
        let texts = self.store.texts().await?;
        if texts.is_empty() {
            return Err(Error::InvalidInput(
                "The vector table holds no documents".to_string(),
            ));
        }
        let prompt = summary_prompt(&texts, self.config.summary_budget_chars);
        let result = self
            .llm
            .generate_with_config(&prompt, &self.generation_config())
            .await?;
        Ok(result.text)
    }

    /// Nearest stored documents to `question`
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchHit>> {
        let vector = self.embedder.embed_one(question).await?;
        self.store
            .search(&vector, &self.config.search_config())
            .await
    }

    /// Answer `question` from the closest stored documents
    pub async fn answer(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("Question is empty".to_string()));
        }

        let hits = self.retrieve(question).await?;
        let context = if hits.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            hits.iter()
                .map(|hit| hit.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let prompt = answer_prompt(&context, question);
        let result = self
            .llm
            .generate_with_config(&prompt, &self.generation_config())
            .await?;
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_summary_prompt_within_budget() {
        let texts = vec!["ü".repeat(5000), "second".to_string()];
        let prompt = summary_prompt(&texts, 200);
        assert_eq!(prompt.chars().count(), 200);
        assert!(prompt.starts_with(SUMMARY_PREAMBLE));

        let short = summary_prompt(&["a".to_string(), "b".to_string()], 6000);
        assert_eq!(short, format!("{}a\nb", SUMMARY_PREAMBLE));
    }

    #[test]
    fn test_validate_summary_budget() {
        assert!(PipelineConfig::default().validate().is_ok());

        let preamble = SUMMARY_PREAMBLE.chars().count();
        let exact = PipelineConfig {
            summary_budget_chars: preamble,
            ..PipelineConfig::default()
        };
        assert!(exact.validate().is_ok());
        assert_eq!(summary_prompt(&["body".to_string()], preamble), SUMMARY_PREAMBLE);

        let tiny = PipelineConfig {
            summary_budget_chars: 40,
            ..PipelineConfig::default()
        };
        let err = tiny.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Summary budget of 40 characters"));
    }

    #[test]
    fn test_answer_prompt_shape() {
        assert_eq!(
            answer_prompt(NO_CONTEXT, "Who?"),
            "You are an AI assistant. Based on the following context from documents:\n'No relevant information found in the documents.'\nAnswer this question: Who?"
        );
    }
}
