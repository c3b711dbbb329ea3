//! Corpus unification.
//!
//! Normalizes the dialect and law collections into a single ordered
//! [`Corpus`] of [`Document`]s. Dialect documents come first, then law
//! documents. A document's position in the corpus is the row of its
//! embedding in [`crate::index::VectorIndex`], so the order is fixed once
//! the corpus is built.

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::config::CorpusConfig;
use crate::error::{RagError, Result};
use crate::models::{DialectRecord, Document, LawRecord};

/// Field separator used in embedding serialization.
pub const FIELD_DELIMITER: &str = "|||";

/// Ordered, immutable sequence of documents.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
}

impl Corpus {
    /// Unify both collections: all dialect records, then all law records.
    ///
    /// The first malformed record aborts unification.
    pub fn unify(dialects: Vec<DialectRecord>, laws: Vec<LawRecord>) -> Result<Self> {
        let mut documents = Vec::with_capacity(dialects.len() + laws.len());
        for (position, record) in dialects.into_iter().enumerate() {
            documents.push(dialect_document(position, record)?);
        }
        for (position, record) in laws.into_iter().enumerate() {
            documents.push(law_document(position, record)?);
        }
        Ok(Self { documents })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Document> {
        self.documents.get(position)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn law_count(&self) -> usize {
        self.documents.iter().filter(|d| d.is_law()).count()
    }

    /// Serialized text of every document, in corpus order.
    pub fn embedding_texts(&self) -> Vec<String> {
        self.documents.iter().map(embedding_text).collect()
    }
}

/// Render a document as the single delimited line that gets embedded.
pub fn embedding_text(doc: &Document) -> String {
    match doc {
        Document::Law { source, text, kind } => format!(
            "Law Source: {source} {FIELD_DELIMITER} Text: {text} {FIELD_DELIMITER} Type: {kind}"
        ),
        Document::Dialect {
            dialect,
            text,
            meaning,
        } => format!(
            "Dialect: {dialect} {FIELD_DELIMITER} Text: {text} {FIELD_DELIMITER} Meaning: {meaning}"
        ),
    }
}

fn dialect_document(position: usize, record: DialectRecord) -> Result<Document> {
    let invalid = |reason: String| RagError::CorpusValidation {
        collection: "dialect",
        position,
        reason,
    };
    let dialect = required(record.dialect, "dialect").map_err(invalid)?;
    let text = required(record.text, "text").map_err(invalid)?;
    let meaning = record.meaning.unwrap_or_default();
    check_delimiter(&[("dialect", &dialect), ("text", &text), ("meaning", &meaning)])
        .map_err(invalid)?;
    Ok(Document::Dialect {
        dialect,
        text,
        meaning,
    })
}

fn law_document(position: usize, record: LawRecord) -> Result<Document> {
    let invalid = |reason: String| RagError::CorpusValidation {
        collection: "law",
        position,
        reason,
    };
    let source = required(record.source, "Source").map_err(invalid)?;
    let text = required(record.text, "text").map_err(invalid)?;
    let kind = record.kind.unwrap_or_default();
    check_delimiter(&[("Source", &source), ("text", &text), ("Type", &kind)]).map_err(invalid)?;
    Ok(Document::Law { source, text, kind })
}

fn required(value: Option<String>, field: &str) -> std::result::Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(format!("field `{field}` is empty")),
        None => Err(format!("missing required field `{field}`")),
    }
}

fn check_delimiter(fields: &[(&str, &str)]) -> std::result::Result<(), String> {
    match fields.iter().find(|(_, v)| v.contains(FIELD_DELIMITER)) {
        Some((name, _)) => Err(format!(
            "field `{name}` contains the reserved delimiter `{FIELD_DELIMITER}`"
        )),
        None => Ok(()),
    }
}

/// Read both corpus files and unify them.
pub fn load_corpus(config: &CorpusConfig) -> Result<Corpus> {
    let dialects: Vec<DialectRecord> = read_records(&config.dialect_path)?;
    let laws: Vec<LawRecord> = read_records(&config.law_path)?;
    let corpus = Corpus::unify(dialects, laws)?;
    info!(
        documents = corpus.len(),
        laws = corpus.law_count(),
        "corpus loaded"
    );
    Ok(corpus)
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let load_error = |reason: String| RagError::CorpusLoad {
        path: path.to_path_buf(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| load_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect(name: &str, text: &str, meaning: Option<&str>) -> DialectRecord {
        DialectRecord {
            id: None,
            dialect: Some(name.to_string()),
            text: Some(text.to_string()),
            norm: None,
            meaning: meaning.map(str::to_string),
        }
    }

    fn law(source: &str, text: &str, kind: Option<&str>) -> LawRecord {
        LawRecord {
            source: Some(source.to_string()),
            text: Some(text.to_string()),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn test_unify_counts_and_origin() {
        let corpus = Corpus::unify(
            vec![
                dialect("miền Tây", "xỉn", Some("say rượu")),
                dialect("Huế", "mô", None),
            ],
            vec![law("Luật Giao thông 2008, Điều 8", "Nghiêm cấm...", Some("luật"))],
        )
        .unwrap();

        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.law_count(), 1);
        let flags: Vec<bool> = corpus.documents().iter().map(Document::is_law).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_dialects_precede_laws() {
        let corpus = Corpus::unify(
            vec![dialect("a", "1", None), dialect("b", "2", None)],
            vec![law("L1", "x", None), law("L2", "y", None)],
        )
        .unwrap();
        let labels: Vec<&str> = corpus.documents().iter().map(Document::source_label).collect();
        assert_eq!(labels, vec!["a", "b", "L1", "L2"]);
    }

    #[test]
    fn test_missing_aux_becomes_empty() {
        let corpus = Corpus::unify(vec![dialect("Huế", "mô", None)], vec![law("L", "t", None)])
            .unwrap();
        assert_eq!(corpus.get(0).unwrap().aux_field(), "");
        assert_eq!(corpus.get(1).unwrap().aux_field(), "");
    }

    #[test]
    fn test_embedding_text_format() {
        let corpus = Corpus::unify(
            vec![dialect("mien Tay", "xin chào", Some("hello"))],
            vec![law("Civil Code Art.1", "Scope", Some("statute"))],
        )
        .unwrap();
        let texts = corpus.embedding_texts();
        assert_eq!(
            texts[0],
            "Dialect: mien Tay ||| Text: xin chào ||| Meaning: hello"
        );
        assert_eq!(
            texts[1],
            "Law Source: Civil Code Art.1 ||| Text: Scope ||| Type: statute"
        );
    }

    #[test]
    fn test_missing_text_rejected_with_position() {
        let mut bad = dialect("Huế", "", None);
        bad.text = None;
        let err = Corpus::unify(vec![dialect("a", "b", None), bad], vec![]).unwrap_err();
        match err {
            RagError::CorpusValidation {
                collection,
                position,
                reason,
            } => {
                assert_eq!(collection, "dialect");
                assert_eq!(position, 1);
                assert!(reason.contains("text"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_text_rejected() {
        let err = Corpus::unify(vec![], vec![law("L", "   ", None)]).unwrap_err();
        assert!(matches!(
            err,
            RagError::CorpusValidation {
                collection: "law",
                position: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_source_label_rejected() {
        let mut no_source = law("L", "t", None);
        no_source.source = None;
        let err = Corpus::unify(vec![], vec![no_source]).unwrap_err();
        assert!(err.to_string().contains("Source"));

        let mut no_dialect = dialect("x", "t", None);
        no_dialect.dialect = None;
        let err = Corpus::unify(vec![no_dialect], vec![]).unwrap_err();
        assert!(err.to_string().contains("dialect"));
    }

    #[test]
    fn test_delimiter_in_field_rejected() {
        let err = Corpus::unify(vec![dialect("a", "x ||| y", None)], vec![]).unwrap_err();
        assert!(err.to_string().contains("reserved delimiter"));
    }

    #[test]
    fn test_empty_collections() {
        let corpus = Corpus::unify(vec![], vec![]).unwrap();
        assert!(corpus.is_empty());
        assert!(corpus.embedding_texts().is_empty());
    }

    #[test]
    fn test_load_corpus_from_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dialect_path = tmp.path().join("data.json");
        let law_path = tmp.path().join("law_data.json");
        std::fs::write(
            &dialect_path,
            r#"[{"id": 1, "dialect": "miền Tây", "text": "xỉn", "norm": "say", "meaning": "say rượu"}]"#,
        )
        .unwrap();
        std::fs::write(
            &law_path,
            r#"[{"Source": "Luật Phòng, chống tác hại của rượu, bia 2019", "text": "Điều 5...", "extra": true}]"#,
        )
        .unwrap();

        let corpus = load_corpus(&CorpusConfig {
            dialect_path,
            law_path: law_path.clone(),
        })
        .unwrap();
        assert_eq!(corpus.len(), 2);
        assert!(corpus.get(1).unwrap().is_law());

        std::fs::write(&law_path, "not json").unwrap();
        let err = load_corpus(&CorpusConfig {
            dialect_path: tmp.path().join("data.json"),
            law_path,
        })
        .unwrap_err();
        assert!(matches!(err, RagError::CorpusLoad { .. }));
    }
}
