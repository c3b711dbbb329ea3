//! # vilaw CLI
//!
//! Command-line interface for the legal question-answering pipeline.
//!
//! ## Usage
//!
//! ```bash
//! vilaw --config ./config/vilaw.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vilaw check` | Load and validate both corpus files, print counts |
//! | `vilaw search "<query>"` | Print the top matching documents |
//! | `vilaw ask "<question>"` | Answer one question |
//! | `vilaw chat` | Interactive question loop on stdin |
//! | `vilaw serve` | Start the HTTP API |
//!
//! Every command except `check` embeds the whole corpus at startup.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use vilaw_rag::assistant::LegalAssistant;
use vilaw_rag::config::{self, Config};
use vilaw_rag::corpus::load_corpus;
use vilaw_rag::logging;
use vilaw_rag::models::RetrievalHit;
use vilaw_rag::server;

/// Words that end `vilaw chat`.
const EXIT_WORDS: [&str; 3] = ["exit", "quit", "thoát"];

const EXCERPT_CHARS: usize = 160;

/// Vietnamese legal question answering over dialect and statute corpora.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/vilaw.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "vilaw",
    about = "Retrieval-augmented answers to Vietnamese legal questions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/vilaw.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the corpus files without embedding anything.
    Check,

    /// Show the documents most similar to a query.
    Search {
        query: String,

        /// Number of results (defaults to `[retrieval].preview_k`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a single question.
    Ask { question: String },

    /// Ask questions interactively. Type `exit`, `quit`, or `thoát` to leave.
    Chat,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Check => run_check(&cfg)?,
        Commands::Search { query, limit } => {
            let assistant = LegalAssistant::from_config(&cfg).await?;
            let limit = limit.unwrap_or(cfg.retrieval.preview_k);
            run_search(&assistant, &query, limit).await?;
        }
        Commands::Ask { question } => {
            let assistant = LegalAssistant::from_config(&cfg).await?;
            println!("{}", assistant.ask(&question).await);
        }
        Commands::Chat => {
            let assistant = LegalAssistant::from_config(&cfg).await?;
            run_chat(&assistant).await?;
        }
        Commands::Serve => {
            let assistant = LegalAssistant::from_config(&cfg).await?;
            server::run_server(assistant, &cfg.server.bind, cfg.retrieval.preview_k).await?;
        }
    }

    Ok(())
}

fn run_check(cfg: &Config) -> anyhow::Result<()> {
    let corpus = load_corpus(&cfg.corpus).context("Corpus check failed")?;
    let laws = corpus.law_count();
    println!("{:<10} {:>8}", "ORIGIN", "COUNT");
    println!("{:<10} {:>8}", "dialect", corpus.len() - laws);
    println!("{:<10} {:>8}", "law", laws);
    println!("{:<10} {:>8}", "total", corpus.len());
    Ok(())
}

async fn run_search(assistant: &LegalAssistant, query: &str, limit: usize) -> anyhow::Result<()> {
    let hits = assistant.retriever().retrieve(query, limit).await?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        print_hit(i + 1, hit);
    }
    Ok(())
}

fn print_hit(rank: usize, hit: &RetrievalHit) {
    let document = &hit.document;
    println!(
        "{}. [{:.2}] {} / {}",
        rank,
        hit.score,
        document.origin().as_str(),
        document.source_label()
    );
    println!("    excerpt: \"{}\"", excerpt(document.body_text()));
    if !document.aux_field().is_empty() {
        let label = if document.is_law() { "type" } else { "meaning" };
        println!("    {}: {}", label, document.aux_field());
    }
    println!("    position: {}", hit.position);
    println!();
}

fn excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    match flat.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat.to_string(),
    }
}

async fn run_chat(assistant: &LegalAssistant) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Nhập câu hỏi về pháp luật (gõ \"thoát\" để kết thúc).");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            break;
        }

        let answer = assistant.ask(question).await;
        println!("{}\n", answer);
    }
    Ok(())
}
