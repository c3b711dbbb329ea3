//! HTTP adapter over [`LegalAssistant`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/answer` | `{ "question" }` → `{ "answer" }`, always 200 |
//! | `POST` | `/search` | `{ "query", "limit"? }` → ranked document previews |
//! | `GET`  | `/health` | Status, version, and corpus size |
//!
//! # Error Contract
//!
//! `/answer` never fails: pipeline errors become the apology text inside a
//! normal answer. `/search` errors use
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! with codes `bad_request` (400) and `retrieval_failed` (500). Provider
//! error details are logged, never returned.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser chat UI on
//! another origin can call the API.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::assistant::LegalAssistant;
use crate::models::{Document, RetrievalHit};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    /// Cheap to clone; the knowledge base is shared behind an `Arc`.
    assistant: LegalAssistant,
    preview_k: usize,
}

/// Build the router. Exposed separately from [`run_server`] so it can be
/// served on any listener.
pub fn router(assistant: LegalAssistant, preview_k: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/answer", post(handle_answer))
        .route("/search", post(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState {
            assistant,
            preview_k: preview_k.max(1),
        })
}

/// Bind to `bind` and serve until the process is terminated.
pub async fn run_server(
    assistant: LegalAssistant,
    bind: &str,
    preview_k: usize,
) -> anyhow::Result<()> {
    let app = router(assistant, preview_k);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(bind, "HTTP server listening");
    println!("Legal QA server listening on http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn retrieval_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "retrieval_failed",
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    documents: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents: state.assistant.retriever().knowledge().len(),
    })
}

// ============ POST /answer ============

#[derive(Deserialize)]
struct AnswerRequest {
    question: String,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

async fn handle_answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Json<AnswerResponse> {
    let answer = state.assistant.ask(&request.question).await;
    Json(AnswerResponse { answer })
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResultItem>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub rank: usize,
    pub position: usize,
    pub score: f32,
    #[serde(flatten)]
    pub document: Document,
}

impl SearchResultItem {
    fn from_hit(rank: usize, hit: RetrievalHit) -> Self {
        Self {
            rank,
            position: hit.position,
            score: hit.score,
            document: hit.document,
        }
    }
}

async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let limit = request.limit.unwrap_or(state.preview_k);
    if limit == 0 {
        return Err(bad_request("limit must be at least 1"));
    }

    let hits = state
        .assistant
        .retriever()
        .retrieve(query, limit)
        .await
        .map_err(|e| {
            error!(error = %e, "search failed");
            retrieval_failed("retrieval is temporarily unavailable")
        })?;

    let results = hits
        .into_iter()
        .enumerate()
        .map(|(i, hit)| SearchResultItem::from_hit(i + 1, hit))
        .collect();
    Ok(Json(SearchResponse { results }))
}
