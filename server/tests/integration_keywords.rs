use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use keyrank_core::persist::{save_model, ModelPaths};
use keyrank_core::TermWeightModel;
use keyrank_server::{build_app, ServerConfig};
use serde_json::Value;
use std::collections::HashMap;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_model(dir: &std::path::Path) {
    let paths = ModelPaths::new(dir);
    let mut vocab: HashMap<String, u32> = HashMap::new();
    vocab.insert("cat".to_string(), 0);
    vocab.insert("dog".to_string(), 1);
    vocab.insert("fish".to_string(), 2);
    let model = TermWeightModel::with_defaults(vocab, vec![1.0, 2.0, 3.0]).unwrap();
    save_model(&paths, &model, "2024-01-01T00:00:00Z").unwrap();
}

fn app() -> (tempfile::TempDir, Router) {
    let dir = tempdir().unwrap();
    build_tiny_model(dir.path());
    let app = build_app(&dir.path().to_string_lossy(), ServerConfig::default()).unwrap();
    (dir, app)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, header::HeaderMap, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

fn post_json(uri: &str, json: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (_dir, app) = app();
    let (status, _, body) = send(app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn keywords_returns_ranked_confidences() {
    let (_dir, app) = app();
    let (status, _, body) = send(app, post_json("/keywords", serde_json::json!({ "text": "cat cat dog", "top_n": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["keywords"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["term"], "cat");
    assert_eq!(arr[0]["confidence"].as_f64().unwrap(), 50.0);
    assert_eq!(arr[1]["term"], "dog");
    assert_eq!(json["top_n"], 2);
}

#[tokio::test]
async fn default_top_n_applies() {
    let (_dir, app) = app();
    let (status, _, body) = send(app, post_json("/keywords", serde_json::json!({ "text": "fish dog cat" }))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["top_n"], 10);
    assert_eq!(json["keywords"].as_array().unwrap().len(), 3);
    assert_eq!(json["keywords"][0]["term"], "fish");
}

#[tokio::test]
async fn input_errors_are_distinguished() {
    let (_dir, app) = app();
    let cases = [
        (serde_json::json!({ "text": "  " }), StatusCode::BAD_REQUEST, "empty_input"),
        (serde_json::json!({ "text": "unicorn" }), StatusCode::UNPROCESSABLE_ENTITY, "empty_result"),
        (serde_json::json!({ "text": "cat", "top_n": 0 }), StatusCode::BAD_REQUEST, "invalid_top_n"),
        (serde_json::json!({ "text": "cat", "top_n": 21 }), StatusCode::BAD_REQUEST, "invalid_top_n"),
    ];
    for (req, expected_status, expected_kind) in cases {
        let (status, _, body) = send(app.clone(), post_json("/keywords", req)).await;
        assert_eq!(status, expected_status);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["kind"], expected_kind);
        assert!(!json["error"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn negative_top_n_is_rejected() {
    let (_dir, app) = app();
    let (status, _, body) = send(app, post_json("/keywords", serde_json::json!({ "text": "cat", "top_n": -1 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["kind"], "invalid_request");
}

#[tokio::test]
async fn malformed_requests_use_the_error_shape() {
    let (_dir, app) = app();
    let req = Request::post("/keywords")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"text\": "))
        .unwrap();
    let (status, _, body) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["kind"], "invalid_request");

    let req = Request::post("/keywords/pdf?top_n=-2").body(Body::from("%PDF")).unwrap();
    let (status, _, body) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["kind"], "invalid_request");
    assert!(json["error"].as_str().unwrap().starts_with("invalid query string"));
}

#[tokio::test]
async fn csv_export_has_headers_and_attachment() {
    let (_dir, app) = app();
    let (status, headers, body) = send(app, post_json("/keywords/csv", serde_json::json!({ "text": "cat dog fish", "top_n": 3 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    assert!(headers[header::CONTENT_DISPOSITION].to_str().unwrap().contains("keywords_with_confidence.csv"));
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(text, "Keyword,Confidence (%)\nfish,50.00%\ndog,33.33%\ncat,16.67%\n");
}

#[tokio::test]
async fn malformed_pdf_is_an_extraction_error() {
    let (_dir, app) = app();
    let req = Request::post("/keywords/pdf?top_n=3")
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from("not a pdf"))
        .unwrap();
    let (status, _, body) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["kind"], "extraction");
}

#[tokio::test]
async fn model_metadata() {
    let (_dir, app) = app();
    let (status, _, body) = send(app, Request::get("/model").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["num_terms"], 3);
    assert_eq!(json["created_at"], "2024-01-01T00:00:00Z");
}

#[test]
fn startup_fails_without_model() {
    let dir = tempdir().unwrap();
    assert!(build_app(&dir.path().join("missing").to_string_lossy(), ServerConfig::default()).is_err());
}

#[test]
fn startup_rejects_inconsistent_limits() {
    let dir = tempdir().unwrap();
    build_tiny_model(dir.path());
    let config = ServerConfig { default_top_n: 30, max_top_n: 20, ..ServerConfig::default() };
    assert!(build_app(&dir.path().to_string_lossy(), config).is_err());
}
