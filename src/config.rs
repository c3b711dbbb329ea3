//! TOML configuration parsing and validation.
//!
//! API keys are never read from the file; providers pull them from the
//! environment when they are constructed.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Locations of the two source collections.
#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub dialect_path: PathBuf,
    pub law_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Number of batches in flight while embedding the corpus.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            max_retries: default_embedding_retries(),
            timeout_secs: default_embedding_timeout(),
            url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_generation_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            max_retries: default_generation_retries(),
            timeout_secs: default_generation_timeout(),
            url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Hits fed to the generator when answering a question.
    #[serde(default = "default_answer_k")]
    pub answer_k: usize,
    /// Hits shown by `search` previews.
    #[serde(default = "default_preview_k")]
    pub preview_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            answer_k: default_answer_k(),
            preview_k: default_preview_k(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_disabled() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    100
}
fn default_concurrency() -> usize {
    1
}
fn default_embedding_retries() -> u32 {
    3
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_generation_retries() -> u32 {
    2
}
fn default_generation_timeout() -> u64 {
    120
}
fn default_answer_k() -> usize {
    10
}
fn default_preview_k() -> usize {
    3
}
fn default_max_chars() -> usize {
    2000
}
fn default_bind() -> String {
    "0.0.0.0:7861".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

fn validate(config: &Config) -> Result<()> {
    let embedding = &config.embedding;
    if embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    if embedding.concurrency == 0 {
        anyhow::bail!("embedding.concurrency must be > 0");
    }
    match embedding.provider.as_str() {
        "disabled" | "hash" | "local" => {}
        "gemini" | "openai" | "ollama" => {
            if embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, hash, gemini, openai, ollama, or local.",
            other
        ),
    }
    if embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0 when set");
    }

    let generation = &config.generation;
    match generation.provider.as_str() {
        "disabled" => {}
        "gemini" | "openai" | "ollama" => {
            if generation.model.is_none() {
                anyhow::bail!(
                    "generation.model must be specified when provider is '{}'",
                    generation.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled, gemini, openai, or ollama.",
            other
        ),
    }

    if config.retrieval.answer_k < 1 {
        anyhow::bail!("retrieval.answer_k must be >= 1");
    }
    if config.retrieval.preview_k < 1 {
        anyhow::bail!("retrieval.preview_k must be >= 1");
    }
    if config.prompt.max_chars == 0 {
        anyhow::bail!("prompt.max_chars must be > 0");
    }

    Ok(())
}
