// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests for POST /api/v1/detect/annotated

use axum::http::StatusCode;
use tower::util::ServiceExt;
use vision_node::api::create_app;

use super::common::{
    multipart_request, response_json, sample_detections, state_with, state_without_detector,
    StubDetector, TINY_PNG,
};

#[tokio::test]
async fn test_annotated_returns_image_bytes() {
    let app = create_app(state_with(StubDetector::with_detections(sample_detections())));

    let request = multipart_request("/api/v1/detect/annotated", "test.png", "image/png", TINY_PNG);
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/png"
    );
    assert!(response.headers().get("x-request-id").is_some());

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    // Body is a re-encoded PNG, not JSON.
    assert!(bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
}

#[tokio::test]
async fn test_annotated_validates_thresholds() {
    let app = create_app(state_with(StubDetector::with_detections(vec![])));

    let request = multipart_request(
        "/api/v1/detect/annotated?confidence=1.5",
        "test.png",
        "image/png",
        TINY_PNG,
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error_type"], "validation_error");
}

#[tokio::test]
async fn test_annotated_rejects_non_image_payload() {
    let app = create_app(state_with(StubDetector::with_detections(vec![])));

    let request = multipart_request(
        "/api/v1/detect/annotated",
        "notes.txt",
        "text/plain",
        b"plain text",
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_annotated_upstream_failure_returns_500() {
    let app = create_app(state_with(StubDetector::failing()));

    let request = multipart_request("/api/v1/detect/annotated", "test.png", "image/png", TINY_PNG);
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = response_json(response).await;
    assert_eq!(json["error_type"], "upstream_failure");
}

#[tokio::test]
async fn test_annotated_without_detector_returns_503() {
    let app = create_app(state_without_detector());

    let request = multipart_request("/api/v1/detect/annotated", "test.png", "image/png", TINY_PNG);
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
