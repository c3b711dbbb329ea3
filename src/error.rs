//! Error taxonomy for the retrieval pipeline.
//!
//! Startup-time variants ([`RagError::CorpusLoad`], [`RagError::CorpusValidation`],
//! [`RagError::DimensionMismatch`]) abort initialization. Per-request variants
//! ([`RagError::EmbeddingUnavailable`], [`RagError::GenerationUnavailable`])
//! are recovered by [`crate::assistant::LegalAssistant::ask`].
//!
//! An empty retrieval result is not an error; see
//! [`crate::prompt::Assembled::NoData`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// A corpus file could not be read or parsed.
    #[error("failed to load corpus file {}: {reason}", path.display())]
    CorpusLoad { path: PathBuf, reason: String },

    /// A raw record is missing a required field or carries unusable content.
    #[error("invalid {collection} record #{position}: {reason}")]
    CorpusValidation {
        collection: &'static str,
        position: usize,
        reason: String,
    },

    /// An embedding vector does not share the index dimension.
    #[error("embedding dimension mismatch at row {position}: expected {expected}, found {found}")]
    DimensionMismatch {
        expected: usize,
        found: usize,
        position: usize,
    },

    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),
}

pub type Result<T> = std::result::Result<T, RagError>;
