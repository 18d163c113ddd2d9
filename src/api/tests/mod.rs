use super::*;
use crate::pipeline::test_helpers;
use crate::provider::ProviderRegistry;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tower::ServiceExt;

mod system;

/// Helper to create a test TaskPipeline instance wrapped in Arc
async fn create_test_pipeline(registry: ProviderRegistry) -> (Arc<TaskPipeline>, tempfile::TempDir) {
    let (pipeline, temp_dir) = test_helpers::create_test_pipeline(registry).await;
    (Arc::new(pipeline), temp_dir)
}

/// Router over `pipeline` using the pipeline's own configuration
fn app(pipeline: &Arc<TaskPipeline>) -> Router {
    create_router(Arc::clone(pipeline), pipeline.get_config())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(pipeline: &Arc<TaskPipeline>, request: Request<Body>) -> Response {
    app(pipeline).oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn json_body<T: DeserializeOwned>(response: Response) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (pipeline, _temp_dir) = create_test_pipeline(ProviderRegistry::new()).await;

    // Port 0 = OS assigns a free port
    let mut config = (*pipeline.get_config()).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let pipeline = pipeline.clone();
        let config = config.clone();
        async move { start_api_server(pipeline, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be running");

    api_handle.abort();
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let (pipeline, _temp_dir) = create_test_pipeline(ProviderRegistry::new()).await;

    let api_handle = pipeline.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (pipeline, _temp_dir) = create_test_pipeline(ProviderRegistry::new()).await;

    let mut config = (*pipeline.get_config()).clone();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["*".to_string()];
    let app = create_router(pipeline, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (pipeline, _temp_dir) = create_test_pipeline(ProviderRegistry::new()).await;

    let mut config = (*pipeline.get_config()).clone();
    config.api.cors_enabled = false;
    let app = create_router(pipeline, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let (pipeline, _temp_dir) = create_test_pipeline(ProviderRegistry::new()).await;

    let mut config = (*pipeline.get_config()).clone();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["http://localhost:3000".to_string()];
    let config = Arc::new(config);

    let allowed = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = create_router(pipeline.clone(), config.clone())
        .oneshot(allowed)
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );

    let other = Request::builder()
        .uri("/health")
        .header("Origin", "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = create_router(pipeline, config).oneshot(other).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
