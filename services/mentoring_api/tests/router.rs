//! services/mentoring_api/tests/router.rs
//!
//! Sends requests through the full router, middleware included, against an
//! in-memory store.

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use mentoring_api_lib::{config::Config, web};
use mentoring_core::{LocalStore, MemoryStore, RecordKey, RecordStore};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "mentoring-upload-boundary";

fn app() -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::new());
    let config = Arc::new(Config::from_lookup(|_| None).unwrap());
    let state = Arc::new(web::AppState::new(store.clone() as Arc<dyn LocalStore>, config));
    (store, web::router(state))
}

/// A multipart request carrying `contents` as the uploaded file.
fn upload(uri: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"export.json\"\r\n\
         Content-Type: application/json\r\n\r\n{contents}\r\n--{b}--\r\n",
        b = BOUNDARY,
        contents = contents
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn gated_routes_answer_conflict_without_a_profile() {
    let (_store, app) = app();
    let (status, body) = send(app.clone(), get("/sessions")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("profile"));

    let (status, _) = send(app, get("/progress")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn gated_routes_open_once_a_profile_is_saved() {
    let (_store, app) = app();
    let save = Request::builder()
        .method("PUT")
        .uri("/profile")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "name": "Ana", "role": "mentor" }).to_string()))
        .unwrap();
    let (status, _) = send(app.clone(), save).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, get("/sessions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn preview_of_a_file_that_is_not_json_is_a_bad_request() {
    let (_store, app) = app();
    let (status, body) = send(app, upload("/import/preview", "my notes, not an export")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn preview_of_an_invalid_export_still_succeeds() {
    let (store, app) = app();
    let (status, body) = send(app, upload("/import/preview", r#"{"sessions":"x"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], json!(false));
    assert!(!body["errors"].as_array().unwrap().is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn importing_an_invalid_export_is_unprocessable() {
    let (store, app) = app();
    let (status, body) = send(app, upload("/import", r#"{"sessions":"x"}"#)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!body["details"].as_array().unwrap().is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn a_write_fault_during_import_is_a_server_error() {
    let (store, app) = app();
    store.fail_writes(true);
    let (status, body) = send(app, upload("/import", r#"{"version":"1.0","sessions":[]}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn an_unknown_policy_is_a_bad_request() {
    let (store, app) = app();
    let (status, body) = send(
        app,
        upload("/import?policy=overwrite", r#"{"version":"1.0"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("overwrite"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn what_the_preview_accepts_the_import_applies() {
    let (store, app) = app();
    let file = r#"{"version":"1.0","profile":{"name":"Ana","role":"Mentor"},
        "sessions":[{"id":"s1","sessionNumber":1,"menteeRating":"4"}]}"#;

    let (status, preview) = send(app.clone(), upload("/import/preview", file)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["valid"], json!(true));

    let (status, summary) = send(app, upload("/import?policy=replace", file)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["policy"], json!("replace"));
    assert_eq!(summary["sessionsAdded"], json!(1));
    assert_eq!(store.profile().await.unwrap().name, "Ana");
    assert!(store.get(RecordKey::Milestones).await.is_some());
}
