//! Integration tests for the synchronous image, upload and queue endpoints.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, post_json, CDN};
use serde_json::json;
use stolink_core::providers::ProviderError;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// /api/image/generate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_returns_uploaded_character_url() {
    let app = common::build_test_app(None);
    let response = post_json(
        app.router,
        "/api/image/generate",
        json!({ "message": "a man in a black suit", "characterId": "c1" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["imageUrl"], format!("{CDN}/media/character_test.png"));
    assert!(json["error"].is_null());
}

#[tokio::test]
async fn generate_reports_provider_failure_in_body() {
    let app = common::build_test_app(Some(ProviderError::ContentPolicy("blocked".into())));
    let response = post_json(
        app.router,
        "/api/image/generate",
        json!({ "message": "a man in a black suit" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "blocked");
    assert!(json["imageUrl"].is_null());
}

#[tokio::test]
async fn generate_without_message_is_rejected() {
    let app = common::build_test_app(None);
    let response = post_json(app.router, "/api/image/generate", json!({})).await;

    assert!(response.status().is_client_error());
}

// ---------------------------------------------------------------------------
// /api/image/edit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edit_returns_uploaded_edited_url() {
    let app = common::build_test_app(None);
    let response = post_json(
        app.router,
        "/api/image/edit",
        json!({ "imageUrl": "https://cdn/media/a.png", "editRequest": "add glasses" }),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["imageUrl"], format!("{CDN}/media/edited_test.png"));
}

#[tokio::test]
async fn edit_with_empty_image_url_fails_validation() {
    let app = common::build_test_app(None);
    let response = post_json(
        app.router,
        "/api/image/edit",
        json!({ "imageUrl": "", "editRequest": "add glasses" }),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "image_url is required for edit action");
}

// ---------------------------------------------------------------------------
// /upload
// ---------------------------------------------------------------------------

fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "stolink-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn upload_stores_file_and_returns_url() {
    let app = common::build_test_app(None);
    let response = app
        .router
        .oneshot(multipart_request("file", "face.png", b"\x89PNG data"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["cloudfront_url"], format!("{CDN}/media/upload_face.png"));
    assert!(json["message"].is_string());

    let uploads = app.files.uploads.lock().unwrap().clone();
    assert_eq!(
        uploads,
        vec![("face.png".to_string(), "image/png".to_string(), 9)]
    );
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let app = common::build_test_app(None);
    let response = app
        .router
        .oneshot(multipart_request("avatar", "face.png", b"data"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(app.files.uploads.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// /api/test/queue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queue_publish_without_broker_is_unavailable() {
    let app = common::build_test_app(None);
    let response = post_json(
        app.router,
        "/api/test/queue",
        json!({ "projectId": "p1", "action": "create", "message": "a man" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn queue_publish_rejects_unknown_action() {
    let app = common::build_test_app(None);
    let response = post_json(
        app.router,
        "/api/test/queue",
        json!({ "projectId": "p1", "action": "resize", "message": "a man" }),
    )
    .await;

    assert!(response.status().is_client_error());
}
