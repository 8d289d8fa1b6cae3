// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests for GET /api/v1/model/info

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use tower::util::ServiceExt;
use vision_node::api::create_app;

use super::common::{response_json, state_with, state_without_detector, StubDetector};

fn get_info() -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/api/v1/model/info")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_model_info_returns_80_classes() {
    let app = create_app(state_with(StubDetector::with_detections(vec![])));

    let response = app.oneshot(get_info()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["model_type"], "YOLOv8");
    assert_eq!(json["task"], "detect");
    assert_eq!(json["input_size"], 640);
    assert_eq!(json["class_count"], 80);

    let classes = json["classes"].as_array().unwrap();
    assert_eq!(classes.len(), 80);
    assert_eq!(classes[0], "person");
    assert_eq!(classes[79], "toothbrush");
}

#[tokio::test]
async fn test_model_info_is_deterministic() {
    let state = state_with(StubDetector::with_detections(vec![]));

    let first = create_app(state.clone()).oneshot(get_info()).await.unwrap();
    let second = create_app(state).oneshot(get_info()).await.unwrap();

    let first_json = response_json(first).await;
    let second_json = response_json(second).await;
    assert_eq!(first_json, second_json);
}

#[tokio::test]
async fn test_model_info_without_detector_returns_503() {
    let app = create_app(state_without_detector());

    let response = app.oneshot(get_info()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = response_json(response).await;
    assert_eq!(json["error_type"], "service_unavailable");
}
