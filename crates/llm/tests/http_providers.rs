//! Completion providers against an in-process HTTP server.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use curator_core::AppError;
use curator_llm::{create_client, LlmRequest};
use serde_json::{json, Value};

async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock listener");
    let addr = listener.local_addr().expect("read mock addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

#[tokio::test]
async fn test_llama_cpp_sends_prompt_and_reads_content() {
    let router = Router::new().route(
        "/completion",
        post(|Json(body): Json<Value>| async move {
            Json(json!({
                "content": format!("echo:{}:{}", body["prompt"].as_str().unwrap_or(""), body["n_predict"]),
                "stop": true
            }))
        }),
    );
    let addr = spawn_server(router).await;

    let client = create_client("llama-cpp", &format!("http://{}/completion", addr), "").unwrap();
    let request = LlmRequest::new("hola")
        .with_max_tokens(16)
        .with_timeout(Duration::from_secs(2));

    let response = client.complete(&request).await.unwrap();
    assert_eq!(response.content, "echo:hola:16");
    assert_eq!(response.shape, "content");
}

#[tokio::test]
async fn test_ollama_posts_to_generate() {
    let router = Router::new().route(
        "/api/generate",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["stream"], false);
            Json(json!({"model": body["model"], "response": " ok ", "done": true}))
        }),
    );
    let addr = spawn_server(router).await;

    let client = create_client("ollama", &format!("http://{}", addr), "llama3.2").unwrap();
    let response = client
        .complete(&LlmRequest::new("x").with_timeout(Duration::from_secs(2)))
        .await
        .unwrap();

    assert_eq!(response.content, "ok");
    assert_eq!(response.model, "llama3.2");
    assert_eq!(response.shape, "response");
}

#[tokio::test]
async fn test_non_success_status_is_generation_unavailable() {
    let router = Router::new().route(
        "/completion",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "loading model") }),
    );
    let addr = spawn_server(router).await;

    let client = create_client("llama-cpp", &format!("http://{}/completion", addr), "").unwrap();
    let err = client.complete(&LlmRequest::new("x")).await.unwrap_err();

    assert!(matches!(err, AppError::GenerationUnavailable(_)));
    assert!(err.to_string().contains("http_503"));
}

#[tokio::test]
async fn test_malformed_and_empty_replies_are_generation_unavailable() {
    let router = Router::new()
        .route("/garbage", post(|| async { "definitely not json" }))
        .route("/empty", post(|| async { Json(json!({"content": "   "})) }));
    let addr = spawn_server(router).await;

    for path in ["garbage", "empty"] {
        let client = create_client("llama-cpp", &format!("http://{}/{}", addr, path), "").unwrap();
        let err = client.complete(&LlmRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, AppError::GenerationUnavailable(_)), "{}", path);
    }
}

#[tokio::test]
async fn test_timeout_aborts_the_call() {
    let router = Router::new().route(
        "/completion",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"content": "too late"}))
        }),
    );
    let addr = spawn_server(router).await;

    let client = create_client("llama-cpp", &format!("http://{}/completion", addr), "").unwrap();
    let started = std::time::Instant::now();
    let err = client
        .complete(&LlmRequest::new("x").with_timeout(Duration::from_millis(150)))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::GenerationUnavailable(_)));
    assert!(started.elapsed() < Duration::from_secs(3));
}
