use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use docqa_cli::{
    display_banner, print_conversion_summary, print_error, print_heading, print_ingest_summary,
    prompt_for_directory, run_session,
};
use docqa_core::{Embedder, Error, GenerationConfig, LLMProvider, VectorStore};
use docqa_extract::{Converter, Extractor, ensure_directory};
use docqa_llm::{OllamaClient, OpenAIClient, OpenAIConfig, OpenAIEmbedder};
use docqa_rag::{
    DocumentPipeline, FastEmbedder, MemoryVectorTable, SqliteVectorTable, ingest_directory,
};

mod config;

use config::AppConfig;

const PING_PROMPT: &str = "Hello! Tell me a fun fact.";
const AGENT_SUMMARY_REQUEST: &str = "Please provide a summary of all documents in the directory";
const AGENT_SAMPLE_QUESTION: &str = "What is the main topic discussed in the documents?";

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Convert documents to text and ask questions about them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every .docx and .pdf in a folder to a .txt beside it
    Convert {
        directory: Option<PathBuf>,
    },
    /// Rebuild the vector table from a folder of documents
    Ingest {
        directory: Option<PathBuf>,
        #[command(flatten)]
        local: LocalArgs,
    },
    /// Ingest a folder, summarise it, then answer questions with a local model
    Run {
        directory: Option<PathBuf>,
        #[command(flatten)]
        local: LocalArgs,
    },
    /// Answer questions against a previously ingested table
    Ask {
        #[command(flatten)]
        local: LocalArgs,
    },
    /// Ingest a folder and chat about it through a hosted model
    Agent {
        directory: Option<PathBuf>,
        /// Where the agent keeps its vectors
        #[arg(long, value_enum, default_value_t = StoreKind::Memory)]
        store: StoreKind,
        #[arg(long)]
        table: Option<PathBuf>,
    },
    /// Send one request to the hosted chat model
    Ping,
}

#[derive(Args, Debug)]
struct LocalArgs {
    /// Vector table file
    #[arg(long)]
    table: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = StoreKind::Sqlite)]
    store: StoreKind,
    /// Local embedding model name
    #[arg(long)]
    embedding_model: Option<String>,
    /// Ollama model used for generation
    #[arg(long)]
    model: Option<String>,
    /// Documents used as answer context
    #[arg(long)]
    top_k: Option<usize>,
    /// Ignore matches farther than this squared distance
    #[arg(long)]
    max_distance: Option<f32>,
    /// Maximum characters in the summary prompt
    #[arg(long)]
    summary_budget: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Sqlite,
    Memory,
}

impl LocalArgs {
    fn apply(&self, config: &mut AppConfig) -> Result<()> {
        if let Some(table) = &self.table {
            config.table_path = table.clone();
        }
        if let Some(model) = &self.embedding_model {
            config.embedding_model = model.clone();
        }
        if let Some(model) = &self.model {
            config.ollama.model = model.clone();
        }
        if let Some(top_k) = self.top_k {
            config.pipeline.top_k = top_k;
        }
        if self.max_distance.is_some() {
            config.pipeline.max_distance = self.max_distance;
        }
        if let Some(budget) = self.summary_budget {
            config.pipeline.summary_budget_chars = budget;
        }
        config.pipeline.validate()?;
        Ok(())
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docqa=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Directory from the command line, then the environment, then a prompt
fn resolve_directory(arg: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf> {
    let dir = match arg.or_else(|| config.documents_dir.clone()) {
        Some(dir) => dir,
        None => prompt_for_directory(io::stdin().lock(), io::stdout())?,
    };
    ensure_directory(&dir)?;
    tracing::debug!(dir = %dir.display(), "Using document directory");
    Ok(dir)
}

fn local_embedder(config: &AppConfig) -> Result<FastEmbedder> {
    Ok(FastEmbedder::new(&config.embedding_model, config.model_cache.clone())?)
}

fn local_llm(config: &AppConfig) -> Result<OllamaClient> {
    Ok(OllamaClient::new(config.ollama.clone())?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();
    let mut config = AppConfig::from_env();

    match cli.command {
        Command::Convert { directory } => {
            let dir = resolve_directory(directory, &config)?;
            let report = Converter::default().convert_directory(&dir)?;
            print_conversion_summary(&report);
        }
        Command::Ingest { directory, local } => {
            local.apply(&mut config)?;
            let dir = resolve_directory(directory, &config)?;
            let embedder = local_embedder(&config)?;
            match local.store {
                StoreKind::Sqlite => {
                    let table = SqliteVectorTable::open(&config.table_path)?;
                    ingest_only(&embedder, &table, &dir).await?;
                }
                StoreKind::Memory => {
                    ingest_only(&embedder, &MemoryVectorTable::new(), &dir).await?;
                }
            }
        }
        Command::Run { directory, local } => {
            local.apply(&mut config)?;
            let dir = resolve_directory(directory, &config)?;
            display_banner(&format!("local model: {}", config.ollama.model));
            let embedder = local_embedder(&config)?;
            let llm = local_llm(&config)?;
            match local.store {
                StoreKind::Sqlite => {
                    let table = SqliteVectorTable::open(&config.table_path)?;
                    let pipeline = DocumentPipeline::new(embedder, table, llm, config.pipeline);
                    run_local(pipeline, &dir).await?;
                }
                StoreKind::Memory => {
                    let table = MemoryVectorTable::new();
                    let pipeline = DocumentPipeline::new(embedder, table, llm, config.pipeline);
                    run_local(pipeline, &dir).await?;
                }
            }
        }
        Command::Ask { local } => {
            local.apply(&mut config)?;
            if local.store == StoreKind::Memory {
                return Err(Error::Configuration(
                    "An in-memory table does not outlive `docqa ingest`; use --store sqlite"
                        .to_string(),
                )
                .into());
            }
            let table = SqliteVectorTable::open(&config.table_path)?;
            let embedder = local_embedder(&config)?;
            match table.dimensions() {
                None => {
                    return Err(Error::Configuration(format!(
                        "No vector table at {}; run `docqa ingest` first",
                        config.table_path.display()
                    ))
                    .into());
                }
                Some(dims) if dims != embedder.dimensions() => {
                    return Err(Error::DimensionMismatch {
                        expected: dims,
                        actual: embedder.dimensions(),
                    }
                    .into());
                }
                Some(_) => {}
            }
            let llm = local_llm(&config)?;
            let mut pipeline = DocumentPipeline::new(embedder, table, llm, config.pipeline);
            pipeline.connect().await?;
            run_session(&pipeline, io::stdin().lock(), io::stdout()).await?;
        }
        Command::Agent { directory, store, table } => {
            let openai = OpenAIConfig::from_env()?;
            let dir = resolve_directory(directory, &config)?;
            display_banner(&format!("hosted model: {}", openai.chat_model));
            let embedder = OpenAIEmbedder::new(openai.clone())?;
            let llm = OpenAIClient::new(openai)?;
            let pipeline_config = config.agent_pipeline();
            pipeline_config.validate()?;
            match store {
                StoreKind::Sqlite => {
                    let path = table.unwrap_or_else(|| config.agent_table_path.clone());
                    let table = SqliteVectorTable::open(path)?;
                    let pipeline = DocumentPipeline::new(embedder, table, llm, pipeline_config);
                    run_agent(pipeline, &dir).await?;
                }
                StoreKind::Memory => {
                    let table = MemoryVectorTable::new();
                    let pipeline = DocumentPipeline::new(embedder, table, llm, pipeline_config);
                    run_agent(pipeline, &dir).await?;
                }
            }
        }
        Command::Ping => {
            let mut client = OpenAIClient::from_env()?;
            client.connect().await?;
            let generation = GenerationConfig::default().with_max_tokens(50);
            let reply = client.generate_with_config(PING_PROMPT, &generation).await?;
            println!("{}", reply.text);
        }
    }

    Ok(())
}

async fn ingest_only<E, V>(embedder: &E, table: &V, dir: &Path) -> Result<()>
where
    E: Embedder,
    V: VectorStore,
{
    let report = ingest_directory(&Extractor::default(), embedder, table, dir).await?;
    print_ingest_summary(&report);
    Ok(())
}

async fn load_documents<E, V, L>(
    pipeline: &DocumentPipeline<E, V, L>,
    dir: &Path,
) -> Result<usize>
where
    E: Embedder,
    V: VectorStore,
    L: LLMProvider,
{
    println!("Loading documents into knowledge base...");
    let report = pipeline.ingest(dir).await?;
    println!("{}", "Documents loaded successfully".green());
    print_ingest_summary(&report);
    Ok(report.succeeded)
}

async fn run_local<E, V, L>(mut pipeline: DocumentPipeline<E, V, L>, dir: &Path) -> Result<()>
where
    E: Embedder,
    V: VectorStore,
    L: LLMProvider,
{
    pipeline.connect().await?;
    if load_documents(&pipeline, dir).await? == 0 {
        println!("{}", "No documents could be loaded; nothing to ask about.".yellow());
        return Ok(());
    }

    print_heading("Generating summary:");
    match pipeline.summarize().await {
        Ok(summary) => println!("{}", summary),
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(e) => print_error(&e),
    }

    run_session(&pipeline, io::stdin().lock(), io::stdout()).await?;
    Ok(())
}

async fn run_agent<E, V, L>(mut pipeline: DocumentPipeline<E, V, L>, dir: &Path) -> Result<()>
where
    E: Embedder,
    V: VectorStore,
    L: LLMProvider,
{
    pipeline.connect().await?;
    if load_documents(&pipeline, dir).await? == 0 {
        println!("{}", "No documents could be loaded; nothing to ask about.".yellow());
        return Ok(());
    }

    for (heading, request) in [
        ("Generating summary of all documents:", AGENT_SUMMARY_REQUEST),
        ("Answering a sample question:", AGENT_SAMPLE_QUESTION),
    ] {
        print_heading(heading);
        match pipeline.answer(request).await {
            Ok(answer) => println!("{}", answer),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => print_error(&e),
        }
    }

    run_session(&pipeline, io::stdin().lock(), io::stdout()).await?;
    Ok(())
}
