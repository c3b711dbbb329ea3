//! The immutable corpus + index pair built once at startup.
//!
//! A [`KnowledgeBase`] is constructed before any request is served and then
//! shared behind an `Arc`. Nothing mutates it afterwards, so readers need
//! no locking.

use std::time::Instant;

use tracing::{info, warn};

use crate::corpus::Corpus;
use crate::embedding::EmbeddingClient;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

#[derive(Debug, Default)]
pub struct KnowledgeBase {
    corpus: Corpus,
    index: VectorIndex,
}

impl KnowledgeBase {
    /// Embed every document in corpus order and build the index.
    ///
    /// Any embedding failure or dimension inconsistency aborts the build;
    /// a partially indexed corpus is never produced.
    pub async fn build(corpus: Corpus, embedder: &EmbeddingClient) -> Result<Self> {
        if corpus.is_empty() {
            warn!("corpus is empty; every question will get the no-data answer");
            return Ok(Self {
                corpus,
                index: VectorIndex::default(),
            });
        }

        let started = Instant::now();
        let texts = corpus.embedding_texts();
        info!(
            documents = texts.len(),
            model = embedder.provider().model_name(),
            batch_size = embedder.batch_size(),
            "embedding corpus"
        );

        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != corpus.len() {
            return Err(RagError::EmbeddingUnavailable(format!(
                "received {} embeddings for {} documents",
                vectors.len(),
                corpus.len()
            )));
        }
        let index = VectorIndex::build(vectors)?;

        info!(
            documents = index.len(),
            dims = index.dims(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "vector index built"
        );
        Ok(Self { corpus, index })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }
}
