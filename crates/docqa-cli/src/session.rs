//! Interactive question loop

use async_trait::async_trait;
use std::io::{BufRead, Write};

use docqa_core::{Embedder, LLMProvider, Result, VectorStore};
use docqa_rag::DocumentPipeline;

pub const QUESTION_PROMPT: &str = "\nAsk a question about the documents (or 'quit' to exit): ";
pub const QUIT: &str = "quit";

/// Anything that can answer a free-form question
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String>;
}

#[async_trait]
impl<E, V, L> QuestionAnswerer for DocumentPipeline<E, V, L>
where
    E: Embedder,
    V: VectorStore,
    L: LLMProvider,
{
    async fn answer(&self, question: &str) -> Result<String> {
        DocumentPipeline::answer(self, question).await
    }
}

/// What happened during a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub answered: usize,
    pub failed: usize,
}

/// Read questions until `quit` or end of input, writing each answer
///
/// Blank lines are ignored. A failed question is reported on `output`
/// and the loop keeps going; only fatal errors end it early.
pub async fn run_session<Q, R, W>(qa: &Q, mut input: R, mut output: W) -> Result<SessionStats>
where
    Q: QuestionAnswerer + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut stats = SessionStats::default();

    loop {
        write!(output, "{}", QUESTION_PROMPT)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }

        let question = line.trim();
        if question.eq_ignore_ascii_case(QUIT) {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match qa.answer(question).await {
            Ok(answer) => {
                writeln!(output, "{}", answer)?;
                stats.answered += 1;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Question failed");
                writeln!(output, "Error: {}", e)?;
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}
