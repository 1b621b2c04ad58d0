//! Integration tests for specreg-ri API endpoints
//!
//! Routes are exercised end-to-end with `tower::ServiceExt::oneshot`
//! against a file-backed database and the default (production) wiring.
//! No export URLs are configured, so a full ingestion run fails with the
//! actionable configuration error — which is itself asserted.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use specreg_common::config::TomlConfig;
use specreg_common::events::EventBus;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

/// Test helper: create test app over a file-backed database
async fn create_test_app() -> (axum::Router, TempDir) {
    let temp = TempDir::new().expect("temp root folder");

    let pool = specreg_ri::db::init_database_pool(&temp.path().join("specreg.db"))
        .await
        .expect("database initialized");

    let event_bus = EventBus::new(100);
    let controller = specreg_ri::services::default_controller(
        pool.clone(),
        event_bus.clone(),
        TomlConfig::default(),
        temp.path(),
    );

    let state = specreg_ri::AppState::new(pool, event_bus, controller);
    (specreg_ri::build_router(state), temp)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "response body was not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&bytes)
        )
    })
}

async fn get_status(app: &axum::Router) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/import/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// Poll /import/status until the record is terminal (or fail after ~5s)
async fn wait_for_terminal(app: &axum::Router) -> Value {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = get_status(app).await;
        let state = status["state"].as_str().unwrap_or_default().to_string();
        if state == "success" || state == "error" {
            return status;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "job never reached a terminal state: {}",
            status
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _temp) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["module"], "specreg-ri");
    assert!(health["version"].is_string());
}

#[tokio::test]
async fn test_status_is_idle_before_any_run() {
    let (app, _temp) = create_test_app().await;

    let status = get_status(&app).await;

    assert_eq!(status["state"], "idle");
    assert_eq!(status["steps"], json!([]));
    assert!(status.get("error").is_none() || status["error"].is_null());
}

#[tokio::test]
async fn test_start_returns_running_snapshot_with_pending_stages() {
    let (app, _temp) = create_test_app().await;

    // Missing body means default options
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/import/start")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let record = body_json(response).await;

    assert_eq!(record["state"], "running");
    let steps = record["steps"].as_array().unwrap();
    let ids: Vec<&str> = steps.iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert_eq!(
        ids,
        vec![
            "stations",
            "radiolines",
            "permits",
            "prune_associations",
            "associate",
            "cleanup"
        ]
    );
    assert!(steps.iter().all(|s| s["status"] == "pending"));

    // No export URLs are configured, so the detached run fails with the
    // actionable configuration error, visible only via polling.
    let terminal = wait_for_terminal(&app).await;
    assert_eq!(terminal["state"], "error");
    assert!(terminal["error"]
        .as_str()
        .unwrap()
        .contains("export URL not configured"));

    // Cleanup still ran to a terminal status
    let steps = terminal["steps"].as_array().unwrap();
    let cleanup = steps.iter().find(|s| s["id"] == "cleanup").unwrap();
    assert_eq!(cleanup["status"], "success");
}

#[tokio::test]
async fn test_start_with_options_body_runs_to_success() {
    let (app, _temp) = create_test_app().await;

    // All ingestion disabled: the pipeline needs no network and no URLs
    let body = json!({
        "options": {
            "import_stations": false,
            "import_radiolines": false,
            "import_permits": false
        }
    });

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/import/start")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let terminal = wait_for_terminal(&app).await;
    assert_eq!(terminal["state"], "success");

    let steps = terminal["steps"].as_array().unwrap();
    for id in ["stations", "radiolines", "permits", "prune_associations", "associate"] {
        let stage = steps.iter().find(|s| s["id"] == id).unwrap();
        assert_eq!(stage["status"], "skipped", "stage {} not skipped", id);
    }
    let cleanup = steps.iter().find(|s| s["id"] == "cleanup").unwrap();
    assert_eq!(cleanup["status"], "success");

    // finished_at present and well-formed on the terminal record
    assert!(terminal["finished_at"].as_str().is_some());
}
