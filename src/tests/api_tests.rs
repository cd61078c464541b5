use crate::api::router;
use crate::config::AppConfig;
use crate::db::Database;
use crate::events::EventHub;
use crate::AppState;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const SNAPSHOT: &str = r#"[
  {"id": 1, "capacity_bytes": 1000, "used_bytes": 100,
   "failure_domain_path": [{"level": "host", "name": "a"}]},
  {"id": 2, "capacity_bytes": 1000, "used_bytes": 500,
   "failure_domain_path": [{"level": "host", "name": "b"}]},
  {"id": 3, "capacity_bytes": 1000, "used_bytes": 900,
   "failure_domain_path": [{"level": "host", "name": "c"}]}
]"#;

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    db.run_migrations().unwrap();
    router(Arc::new(AppState::new(db, AppConfig::default(), EventHub::new(16))))
}

async fn send(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str, body: &str) -> Value {
    let (status, bytes) = send(app, method, uri, body).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_ingest_then_plan() {
    let app = app();

    let ingested = send_json(&app, "POST", "/api/devices", SNAPSHOT).await;
    assert_eq!(ingested["success"], true);
    assert_eq!(ingested["data"]["device_count"], 3);

    let devices = send_json(&app, "GET", "/api/devices", "").await;
    assert_eq!(devices["data"]["devices"].as_array().unwrap().len(), 3);

    let plan = send_json(&app, "POST", "/api/plan", "{}").await;
    assert_eq!(plan["success"], true);
    let swaps = plan["data"]["swaps"].as_array().unwrap();
    assert_eq!(swaps.len(), 1);
    assert_eq!(swaps[0]["from"], 3);
    assert_eq!(swaps[0]["to"], 1);

    let id = plan["data"]["id"].as_i64().unwrap();
    let fetched = send_json(&app, "GET", &format!("/api/plan/{id}"), "").await;
    assert_eq!(fetched["data"]["swaps"], plan["data"]["swaps"]);

    let listed = send_json(&app, "GET", "/api/plans", "").await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_plan_without_snapshot_fails() {
    let app = app();
    let plan = send_json(&app, "POST", "/api/plan", "{}").await;
    assert_eq!(plan["success"], false);
}

#[tokio::test]
async fn test_invalid_snapshot_rejected() {
    let app = app();
    let bad = r#"[{"id": 1, "capacity_bytes": 0, "used_bytes": 0}]"#;
    let resp = send_json(&app, "POST", "/api/devices", bad).await;
    assert_eq!(resp["success"], false);
    assert!(resp["error"].as_str().unwrap().contains("capacity must be positive"));
}

#[tokio::test]
async fn test_histogram_is_svg() {
    let app = app();
    send_json(&app, "POST", "/api/devices", SNAPSHOT).await;

    let (status, body) = send(&app, "GET", "/api/histogram", "").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().starts_with("<svg"));
}

#[tokio::test]
async fn test_status_reports_idle() {
    let app = app();
    let status = send_json(&app, "GET", "/api/status", "").await;
    assert_eq!(status["data"]["state"], "idle");
}

#[tokio::test]
async fn test_get_single_device() {
    let app = app();
    send_json(&app, "POST", "/api/devices", SNAPSHOT).await;

    let found = send_json(&app, "GET", "/api/devices/3", "").await;
    assert_eq!(found["success"], true);
    assert_eq!(found["data"]["name"], "osd.3");
    assert!((found["data"]["utilization"].as_f64().unwrap() - 0.9).abs() < 1e-9);

    let missing = send_json(&app, "GET", "/api/devices/42", "").await;
    assert_eq!(missing["success"], false);
}
