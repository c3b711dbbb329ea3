//! # vilaw-rag
//!
//! Retrieval-augmented question answering over Vietnamese law and
//! colloquial/dialect explanations.
//!
//! Two JSON corpora are unified into one document list, embedded in
//! batches, and indexed for exact cosine search. A question is embedded,
//! matched against the index, and the top documents are rendered into a
//! bounded grounding block for a streaming language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ data.json     │──▶│   Corpus    │──▶│  Embedding   │
//! │ law_data.json │   │   Unifier   │   │  (batched)   │
//! └───────────────┘   └─────────────┘   └──────┬───────┘
//!                                              ▼
//!                     ┌─────────────┐   ┌──────────────┐
//!   question ────────▶│  Retriever  │◀──│ Vector Index │
//!                     └──────┬──────┘   └──────────────┘
//!                            ▼
//!                     ┌─────────────┐   ┌──────────────┐
//!                     │   Prompt    │──▶│  Generation  │──▶ answer
//!                     │   Builder   │   │  (streamed)  │
//!                     └─────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vilaw check                         # validate the corpus files
//! vilaw search "say rượu lái xe"      # top matching documents
//! vilaw ask "Uống rượu lái xe bị phạt thế nào?"
//! vilaw serve                         # HTTP API on [server].bind
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Library error type |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`models`] | Raw records, documents, retrieval hits |
//! | [`corpus`] | Corpus loading and unification |
//! | [`embedding`] | Embedding providers and the batching client |
//! | [`index`] | Exact cosine vector index |
//! | [`knowledge`] | Corpus + index built once at startup |
//! | [`retriever`] | Top-k retrieval |
//! | [`prompt`] | Context rendering, prompt composition, truncation |
//! | [`generation`] | Streaming generation providers |
//! | [`assistant`] | The `ask` entry point |
//! | [`server`] | HTTP API |

pub mod assistant;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generation;
mod http;
pub mod index;
pub mod knowledge;
pub mod logging;
pub mod models;
pub mod prompt;
pub mod retriever;
pub mod server;
