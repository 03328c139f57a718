use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use serial_test::serial;

mod common;

use common::{get, json_post, login_student, login_trainer, multipart_upload, send, send_json};

#[tokio::test]
async fn test_trainer_stats() {
    let app = common::create_test_app();
    let trainer = login_trainer(&app.router).await;
    let student = login_student(&app.router, 3).await;

    send_json(
        &app.router,
        multipart_upload(&trainer, "dns.txt", b"DNS resolves names to addresses."),
    )
    .await;
    for _ in 0..2 {
        send_json(
            &app.router,
            json_post("/hint", Some(&student), json!({ "question": "What is DNS?" })),
        )
        .await;
    }

    let (status, body) = send_json(&app.router, get("/stats", Some(&trainer))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["users"],
        json!(["student01", "student02", "student03", "student04", "student05", "trainer"])
    );
    assert_eq!(body["qdrant_connected"], true);
    assert_eq!(body["llm_connected"], true);
    assert_eq!(body["documents_count"], 1);
    assert_eq!(body["hints_by_level"]["1"], 1);
    assert_eq!(body["hints_by_level"]["2"], 1);
    assert_eq!(body["hints_by_level"]["4"], 0);
    assert_eq!(body["hint_ledger"], "memory");
}

#[tokio::test]
async fn test_degraded_stats() {
    let app = common::create_degraded_app();
    let trainer = login_trainer(&app.router).await;

    let (status, body) = send_json(&app.router, get("/stats", Some(&trainer))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["qdrant_connected"], false);
    assert_eq!(body["llm_connected"], false);
    assert!(body["documents_count"].is_null());
}

#[tokio::test]
async fn test_students_cannot_read_stats() {
    let app = common::create_test_app();
    let student = login_student(&app.router, 4).await;

    let (status, _) = send_json(&app.router, get("/stats", Some(&student))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_service_surface() {
    let app = common::create_test_app();

    let (status, body) = send_json(&app.router, get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["docs"], "/docs");

    let (status, body) = send_json(&app.router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["qdrant"], true);
    assert_eq!(body["llm"], true);

    let (status, body) = send_json(&app.router, get("/docs", None)).await;
    assert_eq!(status, StatusCode::OK);
    let routes = body["routes"].as_array().unwrap();
    assert!(routes
        .iter()
        .any(|r| r["method"] == "POST" && r["path"] == "/hint"));
}

#[tokio::test]
async fn test_responses_carry_trace_id() {
    let app = common::create_test_app();

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        Request::builder()
            .uri("/health")
            .header("x-trace-id", "trace-abc")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.headers().get("x-trace-id").unwrap(), "trace-abc");
}

#[tokio::test]
#[serial]
async fn test_metrics_require_basic_auth() {
    std::env::set_var("METRICS_AUTH", "prom:scrape");
    let app = common::create_test_app();

    let (status, _) = send(&app.router, get("/metrics", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let credentials = general_purpose::STANDARD.encode("prom:scrape");
    let (status, body) = send(
        &app.router,
        Request::builder()
            .uri("/metrics")
            .header(header::AUTHORIZATION, format!("Basic {}", credentials))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    std::env::remove_var("METRICS_AUTH");

    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&body).contains("http_requests_total"));
}
