//! The question-answering entry point.
//!
//! [`LegalAssistant::ask`] runs retrieve → assemble → generate → collect
//! and never fails: every error is logged and replaced with
//! [`APOLOGY_MESSAGE`], and an empty retrieval is answered with
//! [`NO_DATA_MESSAGE`] without calling the generator.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::corpus::load_corpus;
use crate::embedding::EmbeddingClient;
use crate::error::Result;
use crate::generation::{collect_stream, create_generator, GenerationProvider, TextStream};
use crate::knowledge::KnowledgeBase;
use crate::prompt::{Assembled, PromptBuilder, APOLOGY_MESSAGE, NO_DATA_MESSAGE};
use crate::retriever::Retriever;

pub const DEFAULT_ANSWER_K: usize = 10;

/// Result of a successful pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Nothing was retrieved; the generator was not called.
    NoData,
    Generated(String),
}

impl Answer {
    pub fn into_text(self) -> String {
        match self {
            Answer::NoData => NO_DATA_MESSAGE.to_string(),
            Answer::Generated(text) => text,
        }
    }
}

#[derive(Clone)]
pub struct LegalAssistant {
    retriever: Retriever,
    generator: Arc<dyn GenerationProvider>,
    prompt: PromptBuilder,
    top_k: usize,
}

impl LegalAssistant {
    pub fn new(retriever: Retriever, generator: Arc<dyn GenerationProvider>) -> Self {
        Self {
            retriever,
            generator,
            prompt: PromptBuilder::default(),
            top_k: DEFAULT_ANSWER_K,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Load the corpus, build the index, and wire up providers from config.
    ///
    /// This is the startup path: any corpus, embedding, or provider error
    /// is returned and should abort the process.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let embedder = EmbeddingClient::from_config(&config.embedding)?;
        let generator = create_generator(&config.generation)?;

        let corpus = load_corpus(&config.corpus)?;
        let knowledge = KnowledgeBase::build(corpus, &embedder)
            .await
            .context("Failed to build the vector index")?;
        info!(
            documents = knowledge.len(),
            generator = generator.model_name(),
            "assistant ready"
        );

        Ok(Self::new(Retriever::new(Arc::new(knowledge), embedder), generator)
            .with_prompt(PromptBuilder::new(config.prompt.max_chars))
            .with_top_k(config.retrieval.answer_k))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `question`. Always returns user-presentable text.
    pub async fn ask(&self, question: &str) -> String {
        match self.try_answer(question).await {
            Ok(answer) => answer.into_text(),
            Err(e) => {
                error!(error = %e, "failed to answer question");
                APOLOGY_MESSAGE.to_string()
            }
        }
    }

    /// The fallible pipeline behind [`ask`](Self::ask).
    pub async fn try_answer(&self, question: &str) -> Result<Answer> {
        let started = Instant::now();
        let Some(stream) = self.open_stream(question).await? else {
            return Ok(Answer::NoData);
        };
        let answer = collect_stream(stream).await?;
        debug!(
            answer_chars = answer.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answer generated"
        );
        Ok(Answer::Generated(answer))
    }

    /// Retrieve and open the generation stream without consuming it.
    /// `None` means nothing was retrieved.
    pub async fn open_stream(&self, question: &str) -> Result<Option<TextStream>> {
        let hits = self.retriever.retrieve(question, self.top_k).await?;
        match self.prompt.assemble(question, &hits) {
            Assembled::NoData => {
                debug!("no documents retrieved");
                Ok(None)
            }
            Assembled::Prompt(prompt) => Ok(Some(self.generator.generate_stream(&prompt).await?)),
        }
    }
}
