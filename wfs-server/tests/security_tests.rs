//! Security tests for wfs-server
//!
//! Tests the API key gate on write routes:
//! - Open mode when no key is configured
//! - Missing and wrong keys rejected with 401 and a challenge header
//! - Reads, health and version stay public

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;
use wfs_common::config::ServiceConfig;
use wfs_server::{build_router, AppState};

const KEY: &str = "s3cret-key";

/// Test helper: Create app with the API key gate enabled
async fn setup_app_with_auth() -> (TempDir, Router) {
    let dir = TempDir::new().expect("Should create temp dir");
    let db_path = dir.path().join("security.db");
    let pool = wfs_common::db::init_database(&db_path)
        .await
        .expect("Should create test database");

    let mut config = ServiceConfig::with_database(db_path);
    config.api_key = Some(KEY.to_string());

    (dir, build_router(AppState::new(pool, config, None)))
}

fn create_request(api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/records")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder
        .body(Body::from(
            json!({"source": "t", "category": "alpha", "payload": {"priority": 1}}).to_string(),
        ))
        .unwrap()
}

fn process_request(id: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/records/{}/process", id));
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::empty()).unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn test_missing_key_is_rejected() {
    let (_dir, app) = setup_app_with_auth().await;

    let response = app.oneshot(create_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get("www-authenticate").unwrap(), "ApiKey");
    assert!(response.headers().get("x-request-id").is_some());
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["message"], "API key required");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_wrong_key_is_rejected() {
    let (_dir, app) = setup_app_with_auth().await;

    let response = app.oneshot(create_request(Some("guess"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["message"], "Invalid API key");
}

#[tokio::test]
async fn test_valid_key_allows_writes() {
    let (_dir, app) = setup_app_with_auth().await;

    let response = app.clone().oneshot(create_request(Some(KEY))).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let record = extract_json(response.into_body()).await;
    let id = record["id"].as_str().unwrap();

    let response = app.oneshot(process_request(id, Some(KEY))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_process_requires_key() {
    let (_dir, app) = setup_app_with_auth().await;

    let response = app.clone().oneshot(create_request(Some(KEY))).await.unwrap();
    let record = extract_json(response.into_body()).await;
    let id = record["id"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(process_request(&id, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Rejected request left the record untouched
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/records/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let stored = extract_json(response.into_body()).await;
    assert_eq!(stored["status"], "pending");
}

#[tokio::test]
async fn test_reads_are_public() {
    let (_dir, app) = setup_app_with_auth().await;

    for uri in ["/records", "/reports/summary", "/health", "/version"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_open_mode_without_key() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("open.db");
    let pool = wfs_common::db::init_database(&db_path).await.unwrap();
    let app = build_router(AppState::new(pool, ServiceConfig::with_database(db_path), None));

    let response = app.oneshot(create_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}
