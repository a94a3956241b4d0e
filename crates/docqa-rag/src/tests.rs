//! Pipeline tests against in-process model stand-ins

#[cfg(test)]
mod mocks {
    use async_trait::async_trait;
    use std::sync::Mutex;

    use docqa_core::{Embedder, GenerationConfig, GenerationResult, LLMProvider, Result};

    pub const DIMS: usize = 8;

    /// Byte-histogram embedder: equal texts get equal vectors
    pub struct HistogramEmbedder;

    #[async_trait]
    impl Embedder for HistogramEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0; DIMS];
                    for b in text.bytes() {
                        v[b as usize % DIMS] += 1.0;
                    }
                    v
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            DIMS
        }

        fn model_id(&self) -> &str {
            "histogram"
        }
    }

    /// Records every prompt and answers with a fixed reply
    #[derive(Default)]
    pub struct RecordingLlm {
        pub calls: Mutex<Vec<(String, GenerationConfig)>>,
    }

    impl RecordingLlm {
        pub fn prompts(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(p, _)| p.clone())
                .collect()
        }
    }

    #[async_trait]
    impl LLMProvider for RecordingLlm {
        async fn connect(&mut self) -> Result<()> {
            Ok(())
        }

        async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
            self.generate_with_config(prompt, &GenerationConfig::default())
                .await
        }

        async fn generate_with_config(
            &self,
            prompt: &str,
            config: &GenerationConfig,
        ) -> Result<GenerationResult> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), config.clone()));
            Ok(GenerationResult {
                text: "mock reply".to_string(),
                model_id: "recording".to_string(),
                tokens_used: None,
            })
        }

        fn model_id(&self) -> &str {
            "recording"
        }
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::mocks::{DIMS, HistogramEmbedder, RecordingLlm};
    use crate::pipeline::SUMMARY_PREAMBLE;
    use crate::{
        DocumentPipeline, MemoryVectorTable, NO_CONTEXT, PipelineConfig, SqliteVectorTable,
        ingest_directory,
    };
    use docqa_core::{EmbeddingRecord, Error, SearchConfig, VectorStore};
    use docqa_extract::Extractor;
    use insta::assert_yaml_snapshot;
    use std::path::Path;
    use tempfile::TempDir;

    fn pipeline<V: VectorStore>(
        store: V,
        config: PipelineConfig,
    ) -> DocumentPipeline<HistogramEmbedder, V, RecordingLlm> {
        DocumentPipeline::new(HistogramEmbedder, store, RecordingLlm::default(), config)
    }

    fn write_corpus(dir: &Path) {
        std::fs::write(dir.join("apples.txt"), "Apples grow in orchards.").unwrap();
        std::fs::write(dir.join("rockets.txt"), "Rockets burn liquid fuel.").unwrap();
        std::fs::write(dir.join("zebras.txt"), "Zebras have stripes!").unwrap();
    }

    #[test]
    fn test_pipeline_config_default_snapshot() {
        assert_yaml_snapshot!(PipelineConfig::default(), @r###"
        top_k: 1
        max_distance: ~
        summary_budget_chars: 6000
        max_tokens: 200
        instructions: ~
        "###);
    }

    #[tokio::test]
    async fn test_ingest_stores_one_record_per_document() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path());
        let table = SqliteVectorTable::open(dir.path().join("tmp").join("t.sqlite")).unwrap();
        let pipeline = pipeline(table, PipelineConfig::default());

        let docs = dir.path().to_path_buf();
        let report = pipeline.ingest(&docs).await.unwrap();
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(pipeline.store().count().await.unwrap(), 3);
        assert_eq!(pipeline.store().dimensions(), Some(DIMS));
    }

    #[tokio::test]
    async fn test_ingest_counts_unsupported_and_skips_directories() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path());
        std::fs::write(dir.path().join("sheet.xlsx"), "cells").unwrap();
        std::fs::write(dir.path().join("blank.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("archive")).unwrap();

        let pipeline = pipeline(MemoryVectorTable::new(), PipelineConfig::default());
        let report = pipeline.ingest(dir.path()).await.unwrap();
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 2);
        assert_eq!(report.total(), 5);
        assert_eq!(pipeline.store().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ingest_counts_corrupt_documents() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path());
        std::fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4 truncated \x00\xff").unwrap();
        std::fs::write(dir.path().join("broken.docx"), b"not a zip archive").unwrap();

        let pipeline = pipeline(SqliteVectorTable::in_memory().unwrap(), PipelineConfig::default());
        let report = pipeline.ingest(dir.path()).await.unwrap();
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 2);
        let mut failed: Vec<_> = report.failures.iter().map(|f| f.path.as_str()).collect();
        failed.sort();
        assert!(failed[0].ends_with("broken.docx"));
        assert!(failed[1].ends_with("broken.pdf"));

        let vectors = pipeline.store().vectors().unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == DIMS));

        let hits = pipeline
            .store()
            .search(&vectors[0], &SearchConfig::top_k(3))
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[tokio::test]
    async fn test_ingest_directory_needs_no_generator() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path());
        let store = MemoryVectorTable::new();

        let report = ingest_directory(&Extractor::default(), &HistogramEmbedder, &store, dir.path())
            .await
            .unwrap();
        assert_eq!(report.succeeded, 3);
        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(store.dimensions(), Some(DIMS));
    }

    #[tokio::test]
    async fn test_ingest_missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(MemoryVectorTable::new(), PipelineConfig::default());
        let err = pipeline
            .ingest(&dir.path().join("absent"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_reingest_overwrites_table() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path());
        let pipeline = pipeline(SqliteVectorTable::in_memory().unwrap(), PipelineConfig::default());

        pipeline.ingest(dir.path()).await.unwrap();
        pipeline.ingest(dir.path()).await.unwrap();
        assert_eq!(pipeline.store().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_identical_question_retrieves_its_document() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path());
        let pipeline = pipeline(SqliteVectorTable::in_memory().unwrap(), PipelineConfig::default());
        pipeline.ingest(dir.path()).await.unwrap();

        let hits = pipeline.retrieve("Rockets burn liquid fuel.").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "Rockets burn liquid fuel.");
        assert_eq!(hits[0].distance, 0.0);
        assert!(hits[0].source.as_deref().unwrap().ends_with("rockets.txt"));
    }

    #[tokio::test]
    async fn test_answer_puts_context_in_prompt() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path());
        let pipeline = pipeline(MemoryVectorTable::new(), PipelineConfig::default());
        pipeline.ingest(dir.path()).await.unwrap();

        let answer = pipeline.answer("Zebras have stripes!").await.unwrap();
        assert_eq!(answer, "mock reply");
        assert_eq!(
            pipeline.llm().prompts(),
            vec![
                "You are an AI assistant. Based on the following context from documents:\n'Zebras have stripes!'\nAnswer this question: Zebras have stripes!"
            ]
        );
    }

    #[tokio::test]
    async fn test_answer_on_empty_table_says_nothing_found() {
        let store = MemoryVectorTable::new();
        store.create_table(DIMS).await.unwrap();
        let pipeline = pipeline(store, PipelineConfig::default());

        pipeline.answer("Anything?").await.unwrap();
        let prompts = pipeline.llm().prompts();
        assert!(prompts[0].contains(&format!("'{}'", NO_CONTEXT)));
    }

    #[tokio::test]
    async fn test_summary_respects_budget_and_order() {
        let store = MemoryVectorTable::new();
        store.create_table(DIMS).await.unwrap();
        store
            .insert(vec![
                EmbeddingRecord::new(vec![0.0; DIMS], "first"),
                EmbeddingRecord::new(vec![1.0; DIMS], "x".repeat(10_000)),
            ])
            .await
            .unwrap();
        let config = PipelineConfig {
            summary_budget_chars: 500,
            ..Default::default()
        };
        let pipeline = pipeline(store, config);

        pipeline.summarize().await.unwrap();
        let prompt = &pipeline.llm().prompts()[0];
        assert_eq!(prompt.chars().count(), 500);
        assert!(prompt.starts_with(&format!("{}first\nxxx", SUMMARY_PREAMBLE)));
    }

    #[tokio::test]
    async fn test_summary_budget_below_preamble_is_rejected() {
        let store = MemoryVectorTable::new();
        store.create_table(DIMS).await.unwrap();
        store
            .insert(vec![EmbeddingRecord::new(vec![0.0; DIMS], "first")])
            .await
            .unwrap();
        let config = PipelineConfig {
            summary_budget_chars: 20,
            ..Default::default()
        };
        let pipeline = pipeline(store, config);

        let err = pipeline.summarize().await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(pipeline.llm().prompts().is_empty());
    }

    #[tokio::test]
    async fn test_summary_of_empty_table_is_rejected() {
        let pipeline = pipeline(MemoryVectorTable::new(), PipelineConfig::default());
        assert!(matches!(
            pipeline.summarize().await,
            Err(Error::InvalidInput(_))
        ));
        assert!(pipeline.llm().prompts().is_empty());
    }

    #[tokio::test]
    async fn test_instructions_and_top_k_reach_generation() {
        let dir = TempDir::new().unwrap();
        write_corpus(dir.path());
        let config = PipelineConfig {
            top_k: 5,
            max_tokens: 300,
            instructions: Some("Answer questions based on the document contents".to_string()),
            ..Default::default()
        };
        let pipeline = pipeline(MemoryVectorTable::new(), config);
        pipeline.ingest(dir.path()).await.unwrap();

        assert_eq!(pipeline.retrieve("fuel").await.unwrap().len(), 3);

        pipeline.answer("What is discussed?").await.unwrap();
        let calls = pipeline.llm().calls.lock().unwrap();
        let (prompt, generation) = &calls[0];
        assert_eq!(generation.max_tokens, 300);
        assert_eq!(
            generation.instructions.as_deref(),
            Some("Answer questions based on the document contents")
        );
        assert!(prompt.contains("Apples grow in orchards."));
        assert!(prompt.contains("Rockets burn liquid fuel."));
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let pipeline = pipeline(MemoryVectorTable::new(), PipelineConfig::default());
        assert!(matches!(
            pipeline.answer("   ").await,
            Err(Error::InvalidInput(_))
        ));
    }
}
