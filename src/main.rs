use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docrag_core::{Config, Services, resolve_config_path};
use docrag_index::{RetrieveOptions, format_as_context};

#[derive(Parser, Debug)]
#[command(name = "docrag", version, about = "Ingest local documents and query them by meaning")]
struct Cli {
    /// Config file (falls back to DOCRAG_CONFIG, then config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk, embed and store every document under a directory
    Ingest {
        /// Documents directory (defaults to ingest.dir)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Clear the vector store first
        #[arg(long)]
        reset: bool,

        /// Ingest at most N files
        #[arg(long)]
        limit: Option<NonZeroUsize>,
    },
    /// Rank stored chunks against a question
    Query {
        question: String,

        #[arg(long)]
        top_k: Option<NonZeroUsize>,

        /// Only chunks whose document source matches exactly
        #[arg(long)]
        source: Option<String>,

        /// Require a tag; repeat for several
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Print hits as a prompt context block
        #[arg(long)]
        context: bool,
    },
    /// Show document and chunk counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    tracing::debug!(path = %config_path.display(), "resolved config path");
    let config = Config::load(&config_path)?;
    let services = Services::from_config(config)?;
    tracing::info!(
        store = %services.store().path().display(),
        model = %services.config().llm.embedding_model,
        "docrag ready"
    );

    match cli.command {
        Command::Ingest { dir, reset, limit } => {
            let mut options = services.ingest_options(dir.as_deref());
            options.reset = reset;
            options.limit = limit.map(NonZeroUsize::get);

            let report = services
                .pipeline()?
                .ingest(&options)
                .await
                .with_context(|| format!("ingestion of {} failed", options.dir.display()))?;

            println!(
                "Ingested {} document(s), {} chunk(s) in {} ms",
                report.docs_ingested, report.chunks_ingested, report.duration_ms
            );
            if report.docs_skipped > 0 || report.chunks_skipped > 0 {
                println!(
                    "Skipped {} document(s), {} chunk(s)",
                    report.docs_skipped, report.chunks_skipped
                );
            }
            for error in &report.errors {
                println!("  ! {error}");
            }
            if let Some(path) = &report.storage_path {
                println!("Storage: {}", path.display());
            }
        }
        Command::Query {
            question,
            top_k,
            source,
            tags,
            context,
        } => {
            let options = RetrieveOptions {
                top_k: top_k.map_or(services.config().retrieval.top_k, NonZeroUsize::get),
                source,
                tags,
            };
            let hits = services.retriever().retrieve(&question, &options).await?;
            tracing::debug!(hits = hits.len(), top_k = options.top_k, "query answered");

            if context {
                println!("{}", format_as_context(&hits));
                return Ok(());
            }
            if hits.is_empty() {
                println!("No matching chunks.");
            }
            for (rank, hit) in hits.iter().enumerate() {
                println!("#{} score={:.4} id={}", rank + 1, hit.score, hit.chunk_id);
                println!("   {}", serde_json::to_string(&hit.metadata)?);
                println!("{}\n", hit.text);
            }
        }
        Command::Stats => {
            let stats = services.store().stats()?;
            println!("Store: {}", services.store().path().display());
            println!("Documents: {}", stats.documents);
            println!("Chunks: {}", stats.chunks);
        }
    }

    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
