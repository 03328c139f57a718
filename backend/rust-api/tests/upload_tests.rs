use axum::http::StatusCode;

mod common;

use common::{login_student, login_trainer, multipart_upload, send_json};

fn lab_material() -> String {
    (1..=40)
        .map(|n| {
            format!(
                "Step {}: on host 192.168.x.{} run `ufw allow {}/tcp` and check `ufw status`.",
                n,
                n + 10,
                n + 20
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[tokio::test]
async fn test_trainer_uploads_markdown() {
    let app = common::create_test_app();
    let token = login_trainer(&app.router).await;
    let material = lab_material();

    let (status, body) = send_json(
        &app.router,
        multipart_upload(&token, "firewall-lab.md", material.as_bytes()),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    assert_eq!(body["filename"], "firewall-lab.md");

    let stored = app.retriever.stored.lock();
    assert_eq!(body["chunks_created"].as_u64().unwrap(), stored.len() as u64);
    assert!(stored.len() >= 3);
    assert!(stored.iter().all(|chunk| chunk.text.chars().count() <= 1000));
    assert!(stored.iter().all(|chunk| chunk.uploaded_by == "trainer"));
    assert!(stored[0].text.starts_with("Step 1:"));
}

#[tokio::test]
async fn test_upload_rejects_unsupported_extension() {
    let app = common::create_test_app();
    let token = login_trainer(&app.router).await;

    let (status, body) = send_json(
        &app.router,
        multipart_upload(&token, "topology.png", b"\x89PNG"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Only .pdf, .sql, .md, .txt files are supported");
    assert!(app.retriever.stored.lock().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_empty_text() {
    let app = common::create_test_app();
    let token = login_trainer(&app.router).await;

    let (status, body) =
        send_json(&app.router, multipart_upload(&token, "empty.txt", b" \n \n")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "File contains no extractable text");
}

#[tokio::test]
async fn test_upload_rejects_invalid_utf8() {
    let app = common::create_test_app();
    let token = login_trainer(&app.router).await;

    let (status, _) = send_json(
        &app.router,
        multipart_upload(&token, "dump.sql", &[0xc3, 0x28, 0xff]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_students_cannot_upload() {
    let app = common::create_test_app();
    let token = login_student(&app.router, 1).await;

    let (status, body) = send_json(
        &app.router,
        multipart_upload(&token, "notes.txt", b"my notes"),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Only trainers can access this function");
}

#[tokio::test]
async fn test_upload_unavailable_without_vector_store() {
    let app = common::create_degraded_app();
    let token = login_trainer(&app.router).await;

    let (status, _) = send_json(
        &app.router,
        multipart_upload(&token, "notes.txt", b"some text"),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
