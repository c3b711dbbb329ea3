//! In-process embeddings via fastembed.
//!
//! The model is downloaded from Hugging Face on first use and cached; after
//! that no network calls are made. Loaded once and shared behind a mutex
//! because `TextEmbedding::embed` needs `&mut self`.

use std::sync::{Arc, Mutex};

use anyhow::bail;
use async_trait::async_trait;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

const DEFAULT_MODEL: &str = "multilingual-e5-small";

pub struct LocalProvider {
    model_name: String,
    dims: usize,
    model: Arc<Mutex<fastembed::TextEmbedding>>,
}

impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let (fastembed_model, default_dims) = resolve_model(&model_name)?;

        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
        )
        .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))?;

        Ok(Self {
            model_name,
            dims: config.dims.unwrap_or(default_dims),
            model: Arc::new(Mutex::new(model)),
        })
    }
}

fn resolve_model(name: &str) -> anyhow::Result<(fastembed::EmbeddingModel, usize)> {
    match name {
        "multilingual-e5-small" => Ok((fastembed::EmbeddingModel::MultilingualE5Small, 384)),
        "multilingual-e5-base" => Ok((fastembed::EmbeddingModel::MultilingualE5Base, 768)),
        "multilingual-e5-large" => Ok((fastembed::EmbeddingModel::MultilingualE5Large, 1024)),
        "all-minilm-l6-v2" => Ok((fastembed::EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((fastembed::EmbeddingModel::BGESmallENV15, 384)),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large, \
             all-minilm-l6-v2, bge-small-en-v1.5",
            other
        ),
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> Option<usize> {
        Some(self.dims)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RagError::EmbeddingUnavailable("local model lock poisoned".into()))?;
            model
                .embed(texts, None)
                .map_err(|e| RagError::EmbeddingUnavailable(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| RagError::EmbeddingUnavailable(format!("Local embedding task failed: {}", e)))?
    }
}
