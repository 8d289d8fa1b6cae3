// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests for POST /api/v1/detect
//!
//! These tests verify:
//! - Detection results and the count invariant on valid uploads
//! - Threshold validation rejects out-of-range values before inference
//! - Non-image payloads are rejected as client errors
//! - Detector failures surface as upstream failures, not crashes

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use tower::util::ServiceExt; // for `oneshot`
use vision_node::api::create_app;

use super::common::{
    multipart_request, multipart_request_without_file, response_json, sample_detections,
    state_with, state_without_detector, StubDetector, TINY_PNG,
};

#[tokio::test]
async fn test_detect_valid_image_returns_detections() {
    let app = create_app(state_with(StubDetector::with_detections(sample_detections())));

    let request = multipart_request("/api/v1/detect", "test.png", "image/png", TINY_PNG);
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;

    assert!(json["request_id"].as_str().is_some());
    assert_eq!(json["count"], 2);
    assert_eq!(json["detections"].as_array().unwrap().len(), 2);
    assert_eq!(json["detections"][0]["class_name"], "person");
    assert_eq!(json["detections"][1]["class_name"], "dog");
    assert_eq!(json["image_size"]["width"], 1);
    assert_eq!(json["image_size"]["height"], 1);
    assert!(json["processing_time"].as_f64().is_some());
}

#[tokio::test]
async fn test_detect_count_matches_detections_length() {
    let app = create_app(state_with(StubDetector::with_detections(sample_detections())));

    // With confidence=0.8 the stub only reports the 0.91 person.
    let request = multipart_request(
        "/api/v1/detect?confidence=0.8",
        "test.png",
        "image/png",
        TINY_PNG,
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(
        json["count"].as_u64().unwrap() as usize,
        json["detections"].as_array().unwrap().len()
    );
    assert_eq!(json["count"], 1);
    assert_eq!(json["detections"][0]["class_name"], "person");
}

#[tokio::test]
async fn test_detect_reports_bbox_coordinates() {
    let app = create_app(state_with(StubDetector::with_detections(sample_detections())));

    let request = multipart_request("/api/v1/detect", "test.png", "image/png", TINY_PNG);
    let response = app.oneshot(request).await.unwrap();
    let json = response_json(response).await;

    let bbox = &json["detections"][0]["bbox"];
    assert_eq!(bbox["x1"], 10.0);
    assert_eq!(bbox["y1"], 12.0);
    assert_eq!(bbox["x2"], 120.0);
    assert_eq!(bbox["y2"], 240.0);
}

#[tokio::test]
async fn test_detect_rejects_confidence_zero() {
    let app = create_app(state_with(StubDetector::with_detections(vec![])));

    let request = multipart_request(
        "/api/v1/detect?confidence=0",
        "test.png",
        "image/png",
        TINY_PNG,
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error_type"], "validation_error");
    assert_eq!(json["details"]["field"], "confidence");
}

#[tokio::test]
async fn test_detect_rejects_confidence_above_one() {
    let app = create_app(state_with(StubDetector::with_detections(vec![])));

    let request = multipart_request(
        "/api/v1/detect?confidence=1.5",
        "test.png",
        "image/png",
        TINY_PNG,
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_detect_rejects_out_of_range_iou() {
    let app = create_app(state_with(StubDetector::with_detections(vec![])));

    let request = multipart_request(
        "/api/v1/detect?iou_threshold=0.05",
        "test.png",
        "image/png",
        TINY_PNG,
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["details"]["field"], "iou_threshold");
}

#[tokio::test]
async fn test_detect_rejects_non_image_payload() {
    let app = create_app(state_with(StubDetector::with_detections(vec![])));

    let request = multipart_request(
        "/api/v1/detect",
        "notes.txt",
        "text/plain",
        b"This is not an image",
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error_type"], "invalid_request");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .to_lowercase()
        .contains("must be an image"));
}

#[tokio::test]
async fn test_detect_rejects_garbage_with_image_content_type() {
    // Claiming image/png is not enough; magic-byte sniffing must fail it.
    let app = create_app(state_with(StubDetector::with_detections(vec![])));

    let request = multipart_request(
        "/api/v1/detect",
        "fake.png",
        "image/png",
        b"Definitely not PNG data",
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_detect_rejects_missing_file_field() {
    let app = create_app(state_with(StubDetector::with_detections(vec![])));

    let request = multipart_request_without_file("/api/v1/detect");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_detect_upstream_failure_returns_500() {
    let app = create_app(state_with(StubDetector::failing()));

    let request = multipart_request("/api/v1/detect", "test.png", "image/png", TINY_PNG);
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = response_json(response).await;
    assert_eq!(json["error_type"], "upstream_failure");
}

#[tokio::test]
async fn test_detect_without_detector_returns_503() {
    let app = create_app(state_without_detector());

    let request = multipart_request("/api/v1/detect", "test.png", "image/png", TINY_PNG);
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_detect_rejects_get_method() {
    let app = create_app(state_with(StubDetector::with_detections(vec![])));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/detect")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
