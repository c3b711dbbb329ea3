use std::sync::Arc;

use vilaw_rag::assistant::LegalAssistant;
use vilaw_rag::corpus::Corpus;
use vilaw_rag::embedding::{DisabledProvider, EmbeddingClient, HashProvider};
use vilaw_rag::generation::DisabledGenerator;
use vilaw_rag::knowledge::KnowledgeBase;
use vilaw_rag::models::{DialectRecord, LawRecord};
use vilaw_rag::prompt::{APOLOGY_MESSAGE, NO_DATA_MESSAGE};
use vilaw_rag::retriever::Retriever;
use vilaw_rag::server::run_server;

fn corpus() -> Corpus {
    Corpus::unify(
        vec![DialectRecord {
            dialect: Some("miền Tây".into()),
            text: Some("xỉn quắc cần câu".into()),
            meaning: Some("say rượu rất nặng".into()),
            ..Default::default()
        }],
        vec![LawRecord {
            source: Some("Nghị định 100/2019/NĐ-CP, Điều 5".into()),
            text: Some("Phạt tiền người điều khiển xe ô tô có nồng độ cồn".into()),
            kind: Some("Nghị định".into()),
        }],
    )
    .unwrap()
}

/// Build the index with hash embeddings; `query_embedder` serves requests.
async fn assistant(corpus: Corpus, query_embedder: EmbeddingClient) -> LegalAssistant {
    let build_embedder = EmbeddingClient::new(Arc::new(HashProvider::new(64)), 100);
    let knowledge = KnowledgeBase::build(corpus, &build_embedder).await.unwrap();
    LegalAssistant::new(
        Retriever::new(Arc::new(knowledge), query_embedder),
        Arc::new(DisabledGenerator),
    )
}

fn hash_embedder() -> EmbeddingClient {
    EmbeddingClient::new(Arc::new(HashProvider::new(64)), 100)
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not start within 5 seconds");
}

async fn start(assistant: LegalAssistant) -> (u16, tokio::task::JoinHandle<()>) {
    let port = find_free_port();
    let bind = format!("127.0.0.1:{}", port);
    let handle = tokio::spawn(async move {
        run_server(assistant, &bind, 3).await.ok();
    });
    wait_for_server(port).await;
    (port, handle)
}

#[tokio::test]
async fn test_health_reports_document_count() {
    let (port, handle) = start(assistant(corpus(), hash_embedder()).await).await;

    let body: serde_json::Value = reqwest::get(format!("http://127.0.0.1:{}/health", port))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["documents"], 2);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    handle.abort();
}

#[tokio::test]
async fn test_answer_apologizes_when_generation_fails() {
    let (port, handle) = start(assistant(corpus(), hash_embedder()).await).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/answer", port))
        .json(&serde_json::json!({ "question": "Uống rượu lái xe bị phạt gì?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["answer"], APOLOGY_MESSAGE);

    handle.abort();
}

#[tokio::test]
async fn test_answer_with_empty_corpus_has_no_data() {
    let (port, handle) = start(assistant(Corpus::default(), hash_embedder()).await).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/answer", port))
        .json(&serde_json::json!({ "question": "Luật đất đai?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["answer"], NO_DATA_MESSAGE);

    handle.abort();
}

#[tokio::test]
async fn test_search_returns_ranked_previews() {
    let (port, handle) = start(assistant(corpus(), hash_embedder()).await).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&serde_json::json!({ "query": "người điều khiển xe ô tô có nồng độ cồn", "limit": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["rank"], 1);
    assert_eq!(results[0]["origin"], "law");
    assert_eq!(results[0]["source"], "Nghị định 100/2019/NĐ-CP, Điều 5");

    handle.abort();
}

#[tokio::test]
async fn test_search_rejects_empty_query() {
    let (port, handle) = start(assistant(corpus(), hash_embedder()).await).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&serde_json::json!({ "query": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    handle.abort();
}

#[tokio::test]
async fn test_search_failure_hides_provider_detail() {
    let query_embedder = EmbeddingClient::new(Arc::new(DisabledProvider), 100);
    let (port, handle) = start(assistant(corpus(), query_embedder).await).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/search", port))
        .json(&serde_json::json!({ "query": "nồng độ cồn" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "retrieval_failed");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(!message.contains("disabled"), "leaked detail: {}", message);

    handle.abort();
}
