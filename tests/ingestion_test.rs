mod common;

use common::*;
use docs_knowledge_server::{
    config::IngestionConfig,
    ingestion::{IngestRequest, IngestionError, IngestionService},
    mcp::McpRequest,
    models::DEFAULT_VERSION,
};
use serde_json::json;

fn request(url: String, technology: &str, version: Option<&str>) -> IngestRequest {
    IngestRequest {
        url,
        technology: technology.to_string(),
        version: version.map(str::to_string),
    }
}

#[tokio::test]
async fn test_ingest_url_stores_searchable_record() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/docs/tokio.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"title": "Tokio tutorial", "description": "Async runtime for Rust"}"#)
        .create_async()
        .await;

    let store = recording_store().await;
    let service = IngestionService::new(store.clone(), COLLECTION, &IngestionConfig::default()).unwrap();

    let record = service
        .ingest_url(&request(format!("{}/docs/tokio.json", server.url()), "tokio", None))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(record.technology, "tokio");
    assert_eq!(record.version, DEFAULT_VERSION);
    assert_eq!(record.tags, vec!["tokio".to_string()]);
    assert_eq!(record.title(), Some("Tokio tutorial"));

    let outcome = knowledge_base(store).search(None, "tutorial", None).await.unwrap();
    assert_eq!(outcome.total, 1);
    assert_eq!(outcome.hits[0].record.id, record.id);
}

#[tokio::test]
async fn test_http_error_is_fetch_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/missing.json")
        .with_status(404)
        .create_async()
        .await;

    let store = recording_store().await;
    let service = IngestionService::new(store.clone(), COLLECTION, &IngestionConfig::default()).unwrap();
    store.reset();

    let err = service
        .ingest_url(&request(format!("{}/missing.json", server.url()), "tokio", None))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestionError::Fetch { .. }));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_non_json_body_is_decode_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/page.html")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let store = recording_store().await;
    let service = IngestionService::new(store, COLLECTION, &IngestionConfig::default()).unwrap();

    let err = service
        .ingest_url(&request(format!("{}/page.html", server.url()), "html", Some("1.0")))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestionError::Decode(_)));
}

#[tokio::test]
async fn test_invalid_request_never_fetches() {
    let store = recording_store().await;
    let service = IngestionService::new(store.clone(), COLLECTION, &IngestionConfig::default()).unwrap();
    store.reset();

    let err = service
        .ingest_url(&request("not a url".to_string(), "tokio", None))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestionError::Validation(_)));

    let err = service
        .ingest_url(&request("http://localhost/doc.json".to_string(), "", None))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestionError::Validation(_)));

    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_ingest_tool_over_protocol() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/serde.json")
        .with_status(200)
        .with_body(r#"{"title": "Serde", "description": "Serialization framework"}"#)
        .create_async()
        .await;

    let store = recording_store().await;
    let handler = handler(store.clone());

    let call = McpRequest::new(
        1,
        "tools/call",
        json!({
            "name": "ingest-documentation",
            "arguments": {"url": format!("{}/serde.json", server.url()), "technology": "serde", "version": "1.0"}
        }),
    );
    let response = handler.handle(call).await.unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["isError"], false);
    assert!(result["content"][0]["text"].as_str().unwrap().contains("serde (1.0)"));

    let groups = knowledge_base(store).aggregate("version", None).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].value, json!("1.0"));
}
