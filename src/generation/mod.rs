//! Streaming text generation.
//!
//! A [`GenerationProvider`] turns a composed prompt into a lazy
//! [`TextStream`] of fragments. Nothing is buffered beyond the current
//! network chunk, and dropping the stream closes the connection.
//!
//! Remote providers read their response as lines (SSE `data:` frames or
//! NDJSON objects). [`LineDecoder`] splits only on `\n`, which never occurs
//! inside a multi-byte UTF-8 sequence, so characters split across network
//! chunks are reassembled before decoding.

mod remote;

use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};

use crate::config::GenerationConfig;
use crate::error::{RagError, Result};

pub use remote::{GeminiGenerator, OllamaGenerator, OpenAIGenerator};

/// Ordered, finite, single-use sequence of generated fragments.
pub type TextStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn model_name(&self) -> &str;

    /// Open a completion stream for `prompt`. Errors opening the stream
    /// and errors while reading it are both `GenerationUnavailable`.
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream>;
}

/// Concatenate every fragment. The first error aborts collection.
pub async fn collect_stream(stream: TextStream) -> Result<String> {
    stream
        .try_fold(String::new(), |mut answer, fragment| async move {
            answer.push_str(&fragment);
            Ok(answer)
        })
        .await
}

/// Used when `generation.provider = "disabled"`.
pub struct DisabledGenerator;

#[async_trait]
impl GenerationProvider for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate_stream(&self, _prompt: &str) -> Result<TextStream> {
        Err(RagError::GenerationUnavailable(
            "generation provider is disabled".into(),
        ))
    }
}

pub fn create_generator(config: &GenerationConfig) -> anyhow::Result<Arc<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "gemini" => Ok(Arc::new(GeminiGenerator::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        other => anyhow::bail!("Unknown generation provider: {}", other),
    }
}

// ============ Line framing ============

/// Accumulates raw bytes and yields complete lines without the trailing
/// `\n` / `\r\n`.
#[derive(Debug, Default)]
pub(crate) struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Whatever is left after the last newline, if anything.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

struct LineState<B, E> {
    bytes: BoxStream<'static, std::result::Result<B, E>>,
    decoder: LineDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Re-frame a byte stream as a stream of lines. A transport error is
/// yielded once and ends the stream.
pub(crate) fn line_stream<S, B, E>(bytes: S) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = LineState {
        bytes: bytes.boxed(),
        decoder: LineDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.pending.pop_front() {
                return Some((Ok(line), state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.decoder.push(chunk.as_ref());
                    state.pending.extend(lines);
                }
                Some(Err(e)) => {
                    state.done = true;
                    let err = RagError::GenerationUnavailable(format!("stream interrupted: {}", e));
                    return Some((Err(err), state));
                }
                None => {
                    state.done = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

/// What one decoded line contributes to the answer.
#[derive(Debug, PartialEq)]
pub(crate) enum Frame {
    Text(String),
    Skip,
    Done,
}

/// Apply a per-line parser and keep only text, stopping at [`Frame::Done`].
pub(crate) fn fragments<F>(lines: BoxStream<'static, Result<String>>, parse: F) -> TextStream
where
    F: Fn(&str) -> Result<Frame> + Send + 'static,
{
    lines
        .map(move |line| line.and_then(|line| parse(&line)))
        .take_while(|frame| future::ready(!matches!(frame, Ok(Frame::Done))))
        .try_filter_map(|frame| async move {
            Ok(match frame {
                Frame::Text(text) if !text.is_empty() => Some(text),
                _ => None,
            })
        })
        .boxed()
}

/// Payload of an SSE `data:` line; `None` for comments, event names, and
/// blank keep-alive lines.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}
