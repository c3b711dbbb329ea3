//! Core data models used throughout the pipeline.
//!
//! Raw records arrive in two disjoint shapes ([`DialectRecord`], [`LawRecord`])
//! and are unified into the tagged [`Document`] type by [`crate::corpus`].

use serde::{Deserialize, Serialize};

/// Colloquial/dialect explanation as stored in `data.json`.
///
/// Required fields are optional here so that a missing value is reported
/// as a validation error with the record position instead of a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DialectRecord {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub dialect: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub norm: Option<String>,
    #[serde(default)]
    pub meaning: Option<String>,
}

/// Statute excerpt as stored in `law_data.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LawRecord {
    #[serde(rename = "Source", default)]
    pub source: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "Type", default)]
    pub kind: Option<String>,
}

/// Which source collection a [`Document`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Dialect,
    Law,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Dialect => "dialect",
            Origin::Law => "law",
        }
    }
}

/// The canonical unit that is embedded, indexed, and retrieved.
///
/// The variant is fixed at construction; there are no mutating accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "origin", rename_all = "lowercase")]
pub enum Document {
    Dialect {
        dialect: String,
        text: String,
        /// Empty when the record had no `meaning`.
        meaning: String,
    },
    Law {
        source: String,
        text: String,
        /// The record's `Type`, empty when absent.
        kind: String,
    },
}

impl Document {
    pub fn origin(&self) -> Origin {
        match self {
            Document::Dialect { .. } => Origin::Dialect,
            Document::Law { .. } => Origin::Law,
        }
    }

    pub fn is_law(&self) -> bool {
        self.origin() == Origin::Law
    }

    /// Dialect name or law source citation.
    pub fn source_label(&self) -> &str {
        match self {
            Document::Dialect { dialect, .. } => dialect,
            Document::Law { source, .. } => source,
        }
    }

    pub fn body_text(&self) -> &str {
        match self {
            Document::Dialect { text, .. } | Document::Law { text, .. } => text,
        }
    }

    /// `meaning` for dialect documents, `Type` for law documents.
    pub fn aux_field(&self) -> &str {
        match self {
            Document::Dialect { meaning, .. } => meaning,
            Document::Law { kind, .. } => kind,
        }
    }
}

/// A retrieved document with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalHit {
    /// Position of the document in the corpus (the index join key).
    pub position: usize,
    pub score: f32,
    pub document: Document,
}
