// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server wiring for the detection API

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::detect::{detect_annotated_handler, detect_handler};
use super::errors::ApiError;
use super::handlers::{HealthResponse, ModelInfoResponse};
use crate::detector::ObjectDetector;
use crate::version;
use crate::vision::MAX_IMAGE_SIZE;

// Uploads slightly above the image cap still reach the decode path, which
// reports the limit in its own error message.
const BODY_LIMIT: usize = MAX_IMAGE_SIZE + 64 * 1024;

/// Server bind configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Shared state for all request handlers.
///
/// The detector is loaded once at startup and read-only afterwards; `None`
/// means loading failed and detection endpoints answer 503 while the rest
/// of the API stays up.
#[derive(Clone)]
pub struct AppState {
    detector: Option<Arc<dyn ObjectDetector>>,
}

impl AppState {
    pub fn new(detector: Option<Arc<dyn ObjectDetector>>) -> Self {
        Self { detector }
    }

    /// State with no detector loaded (degraded mode, also used in tests).
    pub fn without_detector() -> Self {
        Self { detector: None }
    }

    pub fn model_loaded(&self) -> bool {
        self.detector.is_some()
    }

    /// Handle to the detector, or 503 when it never loaded.
    pub fn detector(&self) -> Result<Arc<dyn ObjectDetector>, ApiError> {
        self.detector.clone().ok_or_else(|| {
            ApiError::ServiceUnavailable(
                "object detector not initialized, service unavailable".to_string(),
            )
        })
    }
}

/// Build the application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/detect", post(detect_handler))
        .route("/api/v1/detect/annotated", post(detect_annotated_handler))
        .route("/api/v1/model/info", get(model_info_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn start_server(config: &ApiConfig, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install ctrl-c handler: {}", e);
    }
}

/// GET / - service metadata
async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "VisionAPI - Object Detection Service",
        "version": version::VERSION_NUMBER,
        "status": "running",
        "endpoints": {
            "health": "/health",
            "detect": "/api/v1/detect",
            "detect_annotated": "/api/v1/detect/annotated",
            "model_info": "/api/v1/model/info",
        },
    }))
}

/// GET /health - liveness probe; never touches the detector.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse::new(state.model_loaded()))
}

/// GET /api/v1/model/info - static model and taxonomy metadata.
async fn model_info_handler(
    State(state): State<AppState>,
) -> Result<Json<ModelInfoResponse>, ApiError> {
    let detector = state.detector()?;
    Ok(Json(detector.info().into()))
}
