//! Shared HTTP plumbing for the remote embedding and generation providers.
//!
//! Retry strategy:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use tracing::warn;

pub(crate) const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub(crate) const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub(crate) const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Build a client with a whole-request timeout.
pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| format!("failed to build HTTP client: {}", e))
}

/// Delay before retry number `attempt` (1-based).
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(5))
}

/// Send a request, retrying transient failures.
///
/// `build` is called once per attempt because a `RequestBuilder` is
/// consumed by `send`. Returns the first successful response; the error
/// string carries the status and body of the last failure.
pub(crate) async fn send_with_retry<F>(
    label: &str,
    max_retries: u32,
    build: F,
) -> Result<reqwest::Response, String>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            warn!(provider = label, attempt, delay_secs = delay.as_secs(), "retrying request");
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                let body_text = response.text().await.unwrap_or_default();
                let message = format!("{} API error {}: {}", label, status, body_text);

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(message);
                    continue;
                }

                return Err(message);
            }
            Err(e) => {
                last_err = Some(format!("{} connection error: {}", label, e));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| format!("{} request failed after retries", label)))
}

/// Gemini API key from the environment.
pub(crate) fn gemini_api_key() -> Option<String> {
    std::env::var("GEMINI_API_KEY")
        .or_else(|_| std::env::var("GENAI_API_KEY"))
        .ok()
        .filter(|k| !k.is_empty())
}

pub(crate) fn openai_api_key() -> Option<String> {
    std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Gemini model ids are addressed as `models/<name>`.
pub(crate) fn gemini_model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

pub(crate) fn base_url(configured: Option<&str>, default: &str) -> String {
    configured.unwrap_or(default).trim_end_matches('/').to_string()
}
