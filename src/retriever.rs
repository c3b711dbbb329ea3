//! Query-time retrieval: embed the question, search the index, join back
//! to documents by corpus position.

use std::sync::Arc;

use tracing::debug;

use crate::embedding::EmbeddingClient;
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::models::RetrievalHit;

/// Cheap to clone; clones share the knowledge base and embedding provider.
#[derive(Clone)]
pub struct Retriever {
    knowledge: Arc<KnowledgeBase>,
    embedder: EmbeddingClient,
}

impl Retriever {
    pub fn new(knowledge: Arc<KnowledgeBase>, embedder: EmbeddingClient) -> Self {
        Self {
            knowledge,
            embedder,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Up to `k` hits in descending score order.
    ///
    /// An empty index yields no hits without embedding the query. There is
    /// no score threshold: a non-empty corpus always returns its nearest
    /// documents, however weak the match.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
        let index = self.knowledge.index();
        if index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_query(query).await?;
        let corpus = self.knowledge.corpus();

        let hits: Vec<RetrievalHit> = index
            .search(&query_vec, k)?
            .into_iter()
            .filter_map(|hit| {
                corpus.get(hit.position).map(|document| RetrievalHit {
                    position: hit.position,
                    score: hit.score,
                    document: document.clone(),
                })
            })
            .collect();

        debug!(
            k,
            hits = hits.len(),
            top_score = hits.first().map(|h| h.score),
            "retrieved"
        );
        Ok(hits)
    }
}
