//! # scrypto-sage CLI (`sage`)
//!
//! Commands for building the vector index from a knowledge base, asking
//! one-shot questions, running the interactive chat, and inspecting the
//! index.
//!
//! ```bash
//! sage index                         # build the vector index
//! sage ask "How do I declare a blueprint?"
//! sage chat                          # interactive Q&A session
//! sage stats                         # index overview
//! sage models                        # supported completion models
//! ```
//!
//! All commands accept `--config` pointing to a TOML configuration file;
//! see `config/sage.example.toml`. The OpenRouter credential is read from
//! the `OPENROUTER_API_KEY` environment variable (a `.env` file is loaded
//! if present).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use scrypto_sage::{chat, config, embedding, index::VectorIndex, pipeline, registry, stats};

/// scrypto-sage: a retrieval-augmented Q&A assistant for Scrypto and
/// Radix DLT developers.
#[derive(Parser)]
#[command(
    name = "sage",
    about = "Retrieval-augmented Q&A assistant for Scrypto and Radix DLT developers",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sage.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the persisted vector index from the knowledge base.
    ///
    /// Loads every markdown and Rust file under the configured root,
    /// chunks them, embeds each chunk, and persists the index. Without
    /// `--rebuild`, an existing index is left untouched.
    Index {
        /// Discard any existing index and re-embed from scratch.
        #[arg(long)]
        rebuild: bool,
    },

    /// Ask a single question and print the answer with sources.
    Ask {
        /// The question to answer.
        question: String,

        /// Print the full response as JSON instead of formatted text.
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive Q&A session.
    Chat,

    /// Show index statistics (chunk counts, categories, size).
    Stats,

    /// List supported completion models with cost and quality notes.
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "scrypto_sage=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Model listing needs no config
    if matches!(cli.command, Commands::Models) {
        registry::print_models();
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Index { rebuild } => {
            if VectorIndex::exists(&cfg.index.path) && !rebuild {
                let embedder = embedding::create_embedder(&cfg.embedding)?;
                let index = VectorIndex::open(&cfg.index.path, embedder.as_ref()).await?;
                let count = index.count().await.unwrap_or(0);
                index.close().await;
                println!(
                    "Index already exists at {} ({} chunks). Use --rebuild to re-embed.",
                    cfg.index.path.display(),
                    count
                );
                return Ok(());
            }

            if rebuild && VectorIndex::exists(&cfg.index.path) {
                std::fs::remove_file(&cfg.index.path)?;
            }

            let embedder = embedding::create_embedder(&cfg.embedding)?;
            let (index, report) = pipeline::build(&cfg, embedder.as_ref()).await?;
            index.close().await;
            println!("index built");
            println!("  documents: {}", report.documents);
            println!("  chunks:    {}", report.chunks);
            println!("  location:  {}", cfg.index.path.display());
        }
        Commands::Ask { question, json } => {
            let mut rag = pipeline::RagPipeline::new(cfg)?;
            rag.init().await?;
            let response = rag.ask(&question).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.answer);
                if response.sources.is_empty() {
                    println!("\n(no relevant knowledge-base sources found)");
                } else {
                    println!("\nSources:");
                    for (i, source) in response.sources.iter().enumerate() {
                        println!("  {}. {} ({})", i + 1, source.filename, source.category);
                    }
                }
            }
        }
        Commands::Chat => {
            chat::run_chat(cfg).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Models => unreachable!(),
    }

    Ok(())
}
