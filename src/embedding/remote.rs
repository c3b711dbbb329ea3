//! HTTP embedding providers: Gemini, OpenAI-compatible, and Ollama.

use anyhow::bail;
use async_trait::async_trait;
use serde_json::Value;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};
use crate::http::{self, send_with_retry};

fn unavailable<S: Into<String>>(message: S) -> RagError {
    RagError::EmbeddingUnavailable(message.into())
}

fn required_model(config: &EmbeddingConfig, provider: &str) -> anyhow::Result<String> {
    config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("embedding.model required for {} provider", provider))
}

fn parse_vector(value: &Value, context: &str) -> Result<Vec<f32>> {
    value
        .as_array()
        .ok_or_else(|| unavailable(format!("Invalid {} response: embedding is not an array", context)))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| unavailable(format!("Invalid {} response: non-numeric value", context)))
        })
        .collect()
}

// ============ Gemini Provider ============

/// Embedding provider using the Gemini `batchEmbedContents` endpoint.
///
/// Requires `GEMINI_API_KEY` (or `GENAI_API_KEY`) in the environment.
/// Gemini accepts at most 100 texts per call, which is the default
/// `embedding.batch_size`.
pub struct GeminiProvider {
    model: String,
    dims: Option<usize>,
    api_key: String,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = required_model(config, "Gemini")?;
        let Some(api_key) = http::gemini_api_key() else {
            bail!("GEMINI_API_KEY (or GENAI_API_KEY) environment variable not set");
        };
        Ok(Self {
            model,
            dims: config.dims,
            api_key,
            base_url: http::base_url(config.url.as_deref(), http::GEMINI_BASE_URL),
            max_retries: config.max_retries,
            client: http::build_client(config.timeout_secs).map_err(anyhow::Error::msg)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> Option<usize> {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model_path = http::gemini_model_path(&self.model);
        let url = format!("{}/{}:batchEmbedContents", self.base_url, model_path);
        let body = gemini_request_body(&model_path, texts);

        let response = send_with_retry("Gemini", self.max_retries, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await
        .map_err(unavailable)?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Invalid Gemini response: {}", e)))?;
        parse_gemini_response(&json)
    }
}

fn gemini_request_body(model_path: &str, texts: &[String]) -> Value {
    let requests: Vec<Value> = texts
        .iter()
        .map(|text| {
            serde_json::json!({
                "model": model_path,
                "content": { "parts": [{ "text": text }] },
            })
        })
        .collect();
    serde_json::json!({ "requests": requests })
}

/// Extracts `embeddings[].values`, in order.
fn parse_gemini_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| unavailable("Invalid Gemini response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|item| {
            let values = item
                .get("values")
                .ok_or_else(|| unavailable("Invalid Gemini response: missing values"))?;
            parse_vector(values, "Gemini")
        })
        .collect()
}

// ============ OpenAI Provider ============

/// Embedding provider using an OpenAI-compatible `POST /v1/embeddings`.
///
/// Requires the `OPENAI_API_KEY` environment variable unless `embedding.url`
/// points at a self-hosted server.
pub struct OpenAIProvider {
    model: String,
    dims: Option<usize>,
    api_key: Option<String>,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = required_model(config, "OpenAI")?;
        let api_key = http::openai_api_key();
        if api_key.is_none() && config.url.is_none() {
            bail!("OPENAI_API_KEY environment variable not set");
        }
        Ok(Self {
            model,
            dims: config.dims,
            api_key,
            base_url: http::base_url(config.url.as_deref(), http::OPENAI_BASE_URL),
            max_retries: config.max_retries,
            client: http::build_client(config.timeout_secs).map_err(anyhow::Error::msg)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> Option<usize> {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
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

        let json: Value = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Invalid OpenAI response: {}", e)))?;
        parse_openai_response(&json)
    }
}

/// Extracts `data[].embedding`, ordered by each item's `index` when present.
fn parse_openai_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| unavailable("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .ok_or_else(|| unavailable("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, parse_vector(embedding, "OpenAI")?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default: `http://localhost:11434`).
pub struct OllamaProvider {
    model: String,
    dims: Option<usize>,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        Ok(Self {
            model: required_model(config, "Ollama")?,
            dims: config.dims,
            base_url: http::base_url(config.url.as_deref(), http::OLLAMA_BASE_URL),
            max_retries: config.max_retries,
            client: http::build_client(config.timeout_secs).map_err(anyhow::Error::msg)?,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> Option<usize> {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = send_with_retry("Ollama", self.max_retries, || {
            self.client.post(&url).json(&body)
        })
        .await
        .map_err(unavailable)?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| unavailable(format!("Invalid Ollama response: {}", e)))?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| unavailable("Invalid Ollama response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|embedding| parse_vector(embedding, "Ollama"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gemini_request_body_shape() {
        let body = gemini_request_body(
            "models/embedding-001",
            &["một".to_string(), "hai".to_string()],
        );
        let requests = body["requests"].as_array().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["model"], "models/embedding-001");
        assert_eq!(requests[1]["content"]["parts"][0]["text"], "hai");
    }

    #[test]
    fn test_parse_gemini_response() {
        let json = json!({
            "embeddings": [ { "values": [0.1, 0.2] }, { "values": [0.3, 0.4] } ]
        });
        let vectors = parse_gemini_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![0.1f32, 0.2], vec![0.3f32, 0.4]]);
    }

    #[test]
    fn test_parse_gemini_response_missing_values() {
        let json = json!({ "embeddings": [ { "vals": [0.1] } ] });
        assert!(matches!(
            parse_gemini_response(&json),
            Err(RagError::EmbeddingUnavailable(_))
        ));
        assert!(parse_gemini_response(&json!({ "error": "quota" })).is_err());
    }

    #[test]
    fn test_parse_openai_response_orders_by_index() {
        let json = json!({
            "data": [
                { "index": 1, "embedding": [2.0] },
                { "index": 0, "embedding": [1.0] }
            ]
        });
        let vectors = parse_openai_response(&json).unwrap();
        assert_eq!(vectors, vec![vec![1.0f32], vec![2.0f32]]);
    }

    #[test]
    fn test_parse_openai_response_rejects_non_numeric() {
        let json = json!({ "data": [ { "embedding": [1.0, "x"] } ] });
        assert!(parse_openai_response(&json).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = json!({ "embeddings": [[1.0, 0.0], [0.0, 1.0]] });
        let vectors = parse_ollama_response(&json).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], vec![0.0f32, 1.0]);
        assert!(parse_ollama_response(&json!({ "embeddings": [1.0] })).is_err());
    }
}
