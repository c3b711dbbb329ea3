//! Embedding provider abstraction and the batching [`EmbeddingClient`].
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]**: returns errors; used when embeddings are not configured.
//! - **[`HashProvider`]**: offline, deterministic feature hashing; no network.
//! - **[`GeminiProvider`]**: Gemini `batchEmbedContents`.
//! - **[`OpenAIProvider`]**: OpenAI-compatible `/v1/embeddings`.
//! - **[`OllamaProvider`]**: a local Ollama instance's `/api/embed` endpoint.
//! - **`LocalProvider`**: in-process fastembed (feature `local-embeddings-fastembed`).
//!
//! A provider embeds one external batch. [`EmbeddingClient`] splits arbitrary
//! input into batches of `batch_size`, runs them, and reassembles the vectors
//! in input order. A failed batch fails the whole call; no partial result
//! is ever returned, because vector position is the document join key.
//!
//! # Provider Selection
//!
//! ```rust
//! # use vilaw_rag::config::EmbeddingConfig;
//! # use vilaw_rag::embedding::create_provider;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let provider = create_provider(&config).unwrap();
//! assert_eq!(provider.model_name(), "disabled");
//! ```

#[cfg(feature = "local-embeddings-fastembed")]
mod local_fastembed;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

#[cfg(feature = "local-embeddings-fastembed")]
pub use local_fastembed::LocalProvider;
pub use remote::{GeminiProvider, OllamaProvider, OpenAIProvider};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"embedding-001"`).
    fn model_name(&self) -> &str;

    /// Returns the vector dimensionality, when known before the first call.
    fn dims(&self) -> Option<usize>;

    /// Embed one batch. Must return exactly one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

// ============ Batching client ============

/// Order-preserving batched access to an [`EmbeddingProvider`].
///
/// Cheap to clone; clones share the provider.
#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    concurrency: usize,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            concurrency: 1,
        }
    }

    /// Allow up to `concurrency` batches in flight. Output order is unaffected.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn from_config(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let provider = create_provider(config)?;
        Ok(Self::new(provider, config.batch_size).with_concurrency(config.concurrency))
    }

    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed `texts`; `output[i]` is the vector of `texts[i]`.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let chunks: Vec<Vec<String>> = texts.chunks(self.batch_size).map(<[String]>::to_vec).collect();

        // `buffered` yields results in submission order regardless of completion order.
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(chunks)
            .map(|batch| async move { self.embed_chunk(&batch).await })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    /// Embed a single query (a batch of one).
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::EmbeddingUnavailable("empty embedding response".into()))
    }

    async fn embed_chunk(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!(
            model = self.provider.model_name(),
            texts = batch.len(),
            "embedding batch"
        );
        let vectors = self.provider.embed(batch).await?;
        if vectors.len() != batch.len() {
            return Err(RagError::EmbeddingUnavailable(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            )));
        }
        if let Some(row) = vectors.iter().position(|v| v.iter().any(|x| !x.is_finite())) {
            return Err(RagError::EmbeddingUnavailable(format!(
                "provider returned a non-finite value in vector {}",
                row
            )));
        }
        Ok(vectors)
    }
}

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
///
/// Used when `embedding.provider = "disabled"` in the configuration.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> Option<usize> {
        None
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(RagError::EmbeddingUnavailable(
            "embedding provider is disabled".into(),
        ))
    }
}

// ============ Hash Provider ============

/// Deterministic bag-of-words embedder built on feature hashing.
///
/// Each lowercase alphanumeric token is hashed with SHA-256; the digest picks
/// a bucket and a sign. Texts sharing words land close together, identical
/// texts get identical vectors, and an empty text yields the zero vector
/// (a valid but low-information embedding). Needs no network or model files.
pub struct HashProvider {
    dims: usize,
}

impl HashProvider {
    pub const DEFAULT_DIMS: usize = 256;

    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(head) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashProvider {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> Option<usize> {
        Some(self.dims)
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// # Supported Providers
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"hash"` | [`HashProvider`] |
/// | `"gemini"` | [`GeminiProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"local"` | `LocalProvider` (feature `local-embeddings-fastembed`) |
///
/// # Errors
///
/// Returns an error for unknown provider names or if the provider
/// cannot be initialized (missing model, API key, or feature flag).
pub fn create_provider(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledProvider)),
        "hash" => Ok(Arc::new(HashProvider::new(
            config.dims.unwrap_or(HashProvider::DEFAULT_DIMS),
        ))),
        "gemini" => Ok(Arc::new(GeminiProvider::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Ok(Arc::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => anyhow::bail!(
            "Local embedding provider requires --features local-embeddings-fastembed"
        ),
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    }
}
