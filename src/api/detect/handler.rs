// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handlers

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{header, HeaderName};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::Multipart;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::request::DetectQuery;
use super::response::{DetectionResponse, ImageSize};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::detector::{DetectOptions, Detection, ObjectDetector};
use crate::vision::{decode_image_bytes, encode_image, format_to_mime, ImageInfo};

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp", "gif"];

/// Image upload extracted from a multipart form
pub(crate) struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

/// POST /api/v1/detect - Detect objects in an uploaded image
///
/// Multipart `file` field plus optional `confidence` and `iou_threshold`
/// query parameters (each in 0.1-1.0). Returns detections as JSON.
///
/// # Errors
/// - 400 Bad Request: threshold out of range, missing/empty/non-image upload
/// - 503 Service Unavailable: detector never loaded
/// - 500 Internal Server Error: the detector failed mid-inference
pub async fn detect_handler(
    State(state): State<AppState>,
    Query(query): Query<DetectQuery>,
    multipart: Multipart,
) -> Result<Json<DetectionResponse>, ApiError> {
    let started = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let opts = query.validate().map_err(|e| {
        warn!("Request {} rejected: {}", request_id, e);
        e
    })?;
    let detector = state.detector()?;

    let upload = read_image_field(multipart).await?;
    validate_upload(&upload)?;
    debug!(
        "Request {}: {} byte upload ({:?})",
        request_id,
        upload.bytes.len(),
        upload.file_name
    );

    let (_, detections, image_info) = decode_and_detect(detector, upload.bytes, opts).await?;

    let processing_time = started.elapsed().as_secs_f64();
    info!(
        "Request {} completed: {} objects detected in {:.3}s",
        request_id,
        detections.len(),
        processing_time
    );

    Ok(Json(DetectionResponse::new(
        request_id,
        detections.into_iter().map(Into::into).collect(),
        processing_time,
        ImageSize {
            width: image_info.width,
            height: image_info.height,
        },
    )))
}

/// POST /api/v1/detect/annotated - Detect objects and return the image with
/// boxes and labels drawn, re-encoded in the source format.
///
/// Same inputs and error taxonomy as `detect_handler`; the body is binary
/// image data and the request id travels in the `X-Request-ID` header.
pub async fn detect_annotated_handler(
    State(state): State<AppState>,
    Query(query): Query<DetectQuery>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let opts = query.validate().map_err(|e| {
        warn!("Request {} rejected: {}", request_id, e);
        e
    })?;
    let detector = state.detector()?;

    let upload = read_image_field(multipart).await?;
    validate_upload(&upload)?;

    let bytes = upload.bytes;
    let (encoded, mime) = tokio::task::spawn_blocking(move || {
        let (image, info) = decode_upload(&bytes)?;
        let detections = run_detector(&*detector, &image, &opts)?;
        let annotated = detector
            .annotate(&image, &detections)
            .map_err(|e| ApiError::UpstreamFailure(format!("annotation failed: {}", e)))?;
        let encoded = encode_image(&annotated, info.format)
            .map_err(|e| ApiError::UpstreamFailure(format!("re-encoding failed: {}", e)))?;
        Ok::<_, ApiError>((encoded, format_to_mime(info.format)))
    })
    .await
    .map_err(|e| ApiError::UpstreamFailure(format!("detection task failed: {}", e)))??;

    info!(
        "Request {} annotated: {} bytes ({}) in {:.3}s",
        request_id,
        encoded.len(),
        mime,
        started.elapsed().as_secs_f64()
    );

    let headers = [
        (header::CONTENT_TYPE, mime.to_string()),
        (HeaderName::from_static("x-request-id"), request_id),
    ];
    Ok((headers, encoded).into_response())
}

/// Pull the `file` field out of the multipart form.
pub(crate) async fn read_image_field(mut multipart: Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("malformed multipart request: {}", e)))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("failed to read upload: {}", e)))?;
            return Ok(ImageUpload {
                bytes: bytes.to_vec(),
                file_name,
                content_type,
            });
        }
    }
    Err(ApiError::InvalidRequest(
        "missing multipart field 'file'".to_string(),
    ))
}

/// Advisory checks on the upload metadata before touching the bytes.
pub(crate) fn validate_upload(upload: &ImageUpload) -> Result<(), ApiError> {
    if let Some(content_type) = &upload.content_type {
        if !content_type.starts_with("image/") {
            return Err(ApiError::InvalidRequest(
                "file must be an image (JPEG, PNG, BMP, WebP or GIF)".to_string(),
            ));
        }
    }

    if let Some(name) = &upload.file_name {
        if let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) {
            if !ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
                return Err(ApiError::InvalidRequest(format!(
                    "unsupported image format '.{}', allowed: {}",
                    ext,
                    ALLOWED_EXTENSIONS.join(", ")
                )));
            }
        }
    }

    if upload.bytes.is_empty() {
        return Err(ApiError::InvalidRequest("uploaded file is empty".to_string()));
    }

    Ok(())
}

/// Spill the upload to a per-request scratch file and decode it from there.
/// The scratch file is uniquely named and removed when the handle drops,
/// on every exit path.
fn decode_upload(bytes: &[u8]) -> Result<(image::DynamicImage, ImageInfo), ApiError> {
    let mut scratch = NamedTempFile::new()
        .map_err(|e| ApiError::UpstreamFailure(format!("scratch file: {}", e)))?;
    scratch
        .write_all(bytes)
        .map_err(|e| ApiError::UpstreamFailure(format!("scratch file: {}", e)))?;

    let stored = std::fs::read(scratch.path())
        .map_err(|e| ApiError::UpstreamFailure(format!("scratch file: {}", e)))?;
    decode_image_bytes(&stored)
        .map_err(|e| ApiError::InvalidRequest(format!("invalid image: {}", e)))
}

fn run_detector(
    detector: &dyn ObjectDetector,
    image: &image::DynamicImage,
    opts: &DetectOptions,
) -> Result<Vec<Detection>, ApiError> {
    detector.detect(image, opts).map_err(|e| {
        error!("Detector failed: {}", e);
        ApiError::UpstreamFailure(format!("detection failed: {}", e))
    })
}

async fn decode_and_detect(
    detector: Arc<dyn ObjectDetector>,
    bytes: Vec<u8>,
    opts: DetectOptions,
) -> Result<(image::DynamicImage, Vec<Detection>, ImageInfo), ApiError> {
    tokio::task::spawn_blocking(move || {
        let (image, info) = decode_upload(&bytes)?;
        let detections = run_detector(&*detector, &image, &opts)?;
        Ok((image, detections, info))
    })
    .await
    .map_err(|e| ApiError::UpstreamFailure(format!("detection task failed: {}", e)))?
}
