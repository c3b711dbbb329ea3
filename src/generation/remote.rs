//! HTTP generation providers: Gemini, OpenAI-compatible, and Ollama.
//!
//! Opening a stream goes through the shared retry helper. Once the first
//! byte arrives a failure is terminal; a half-streamed answer is never
//! retried.

use anyhow::bail;
use async_trait::async_trait;
use serde_json::Value;

use super::{fragments, line_stream, sse_data, Frame, GenerationProvider, TextStream};
use crate::config::GenerationConfig;
use crate::error::{RagError, Result};
use crate::http::{self, send_with_retry};

fn unavailable<S: Into<String>>(message: S) -> RagError {
    RagError::GenerationUnavailable(message.into())
}

fn required_model(config: &GenerationConfig, provider: &str) -> anyhow::Result<String> {
    config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("generation.model required for {} provider", provider))
}

fn parse_json(data: &str, provider: &str) -> Result<Value> {
    serde_json::from_str(data)
        .map_err(|e| unavailable(format!("Malformed {} stream frame: {}", provider, e)))
}

/// An `{"error": ...}` object inside the stream.
fn stream_error(json: &Value, provider: &str) -> Option<RagError> {
    let error = json.get("error")?;
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(unavailable(format!("{} stream error: {}", provider, message)))
}

// ============ Gemini ============

/// `streamGenerateContent` with `alt=sse`.
///
/// Requires `GEMINI_API_KEY` (or `GENAI_API_KEY`).
pub struct GeminiGenerator {
    model: String,
    api_key: String,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let model = required_model(config, "Gemini")?;
        let Some(api_key) = http::gemini_api_key() else {
            bail!("GEMINI_API_KEY (or GENAI_API_KEY) environment variable not set");
        };
        Ok(Self {
            model,
            api_key,
            base_url: http::base_url(config.url.as_deref(), http::GEMINI_BASE_URL),
            max_retries: config.max_retries,
            client: http::build_client(config.timeout_secs).map_err(anyhow::Error::msg)?,
        })
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse",
            self.base_url,
            http::gemini_model_path(&self.model)
        );
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let response = send_with_retry("Gemini", self.max_retries, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await
        .map_err(unavailable)?;

        Ok(fragments(line_stream(response.bytes_stream()), parse_gemini_line))
    }
}

/// Text of every part of the first candidate. A blocked prompt is an error.
fn parse_gemini_line(line: &str) -> Result<Frame> {
    let Some(data) = sse_data(line) else {
        return Ok(Frame::Skip);
    };
    let json = parse_json(data, "Gemini")?;
    if let Some(err) = stream_error(&json, "Gemini") {
        return Err(err);
    }
    if let Some(reason) = json
        .pointer("/promptFeedback/blockReason")
        .and_then(|r| r.as_str())
    {
        return Err(unavailable(format!("Gemini blocked the prompt: {}", reason)));
    }

    let text: String = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();
    Ok(Frame::Text(text))
}

// ============ OpenAI ============

/// Chat completions with `stream: true`. Works against any
/// OpenAI-compatible server when `generation.url` is set, in which case the
/// API key is optional.
pub struct OpenAIGenerator {
    model: String,
    api_key: Option<String>,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let model = required_model(config, "OpenAI")?;
        let api_key = http::openai_api_key();
        if api_key.is_none() && config.url.is_none() {
            bail!("OPENAI_API_KEY environment variable not set");
        }
        Ok(Self {
            model,
            api_key,
            base_url: http::base_url(config.url.as_deref(), http::OPENAI_BASE_URL),
            max_retries: config.max_retries,
            client: http::build_client(config.timeout_secs).map_err(anyhow::Error::msg)?,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": true,
        });

        let response = send_with_retry("OpenAI", self.max_retries, || {
            let request = self.client.post(&url).json(&body);
            match &self.api_key {
                Some(key) => request.bearer_auth(key),
                None => request,
            }
        })
        .await
        .map_err(unavailable)?;

        Ok(fragments(line_stream(response.bytes_stream()), parse_openai_line))
    }
}

fn parse_openai_line(line: &str) -> Result<Frame> {
    let Some(data) = sse_data(line) else {
        return Ok(Frame::Skip);
    };
    if data == "[DONE]" {
        return Ok(Frame::Done);
    }
    let json = parse_json(data, "OpenAI")?;
    if let Some(err) = stream_error(&json, "OpenAI") {
        return Err(err);
    }
    Ok(json
        .pointer("/choices/0/delta/content")
        .and_then(|c| c.as_str())
        .map(|c| Frame::Text(c.to_string()))
        .unwrap_or(Frame::Skip))
}

// ============ Ollama ============

/// `POST /api/generate`, streamed as newline-delimited JSON.
pub struct OllamaGenerator {
    model: String,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        Ok(Self {
            model: required_model(config, "Ollama")?,
            base_url: http::base_url(config.url.as_deref(), http::OLLAMA_BASE_URL),
            max_retries: config.max_retries,
            client: http::build_client(config.timeout_secs).map_err(anyhow::Error::msg)?,
        })
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        let url = format!("{}/api/generate", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": true,
        });

        let response = send_with_retry("Ollama", self.max_retries, || {
            self.client.post(&url).json(&body)
        })
        .await
        .map_err(unavailable)?;

        Ok(fragments(line_stream(response.bytes_stream()), parse_ollama_line))
    }
}

fn parse_ollama_line(line: &str) -> Result<Frame> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Frame::Skip);
    }
    let json = parse_json(line, "Ollama")?;
    if let Some(err) = stream_error(&json, "Ollama") {
        return Err(err);
    }
    let text = json
        .get("response")
        .and_then(|r| r.as_str())
        .unwrap_or_default();
    if json.get("done").and_then(|d| d.as_bool()) == Some(true) && text.is_empty() {
        return Ok(Frame::Done);
    }
    Ok(Frame::Text(text.to_string()))
}
