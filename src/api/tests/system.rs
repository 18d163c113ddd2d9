use super::*;

#[tokio::test]
async fn test_health_endpoint() {
    let (pipeline, _temp_dir) =
        create_test_pipeline(test_helpers::registry_with(test_helpers::fixture())).await;

    let response = send(&pipeline, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["accepting_tasks"], true);
    assert_eq!(body["providers"], 1);
}

#[tokio::test]
async fn test_health_reports_shutdown() {
    let (pipeline, _temp_dir) = create_test_pipeline(ProviderRegistry::new()).await;
    pipeline.shutdown().await.unwrap();

    let body: serde_json::Value = json_body(send(&pipeline, get("/health")).await).await;
    assert_eq!(body["accepting_tasks"], false);
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let (pipeline, _temp_dir) = create_test_pipeline(ProviderRegistry::new()).await;

    let response = send(&pipeline, get("/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let spec: serde_json::Value = json_body(response).await;
    assert!(spec["openapi"].as_str().unwrap().starts_with("3."));
    assert_eq!(spec["info"]["title"], "astrocollector REST API");
    assert!(spec["paths"]["/export"].is_object());
}

#[tokio::test]
async fn test_swagger_ui_toggle() {
    let (pipeline, _temp_dir) = create_test_pipeline(ProviderRegistry::new()).await;

    let mut config = (*pipeline.get_config()).clone();
    config.api.swagger_ui = true;
    let response = create_router(pipeline.clone(), Arc::new(config.clone()))
        .oneshot(get("/api-docs/openapi.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    config.api.swagger_ui = false;
    let response = create_router(pipeline, Arc::new(config))
        .oneshot(get("/api-docs/openapi.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
