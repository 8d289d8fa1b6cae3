// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Query parameters for the detection endpoints

use serde::Deserialize;

use crate::api::ApiError;
use crate::detector::DetectOptions;

pub const DEFAULT_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const MIN_THRESHOLD: f32 = 0.1;
pub const MAX_THRESHOLD: f32 = 1.0;

/// Optional `confidence` and `iou_threshold` query parameters.
///
/// Both default when omitted and must lie in `[0.1, 1.0]`; anything else is
/// rejected before the detector is invoked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectQuery {
    pub confidence: Option<f32>,
    pub iou_threshold: Option<f32>,
}

impl DetectQuery {
    pub fn validate(&self) -> Result<DetectOptions, ApiError> {
        let confidence = self.confidence.unwrap_or(DEFAULT_CONFIDENCE);
        let iou_threshold = self.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD);

        check_threshold("confidence", confidence)?;
        check_threshold("iou_threshold", iou_threshold)?;

        Ok(DetectOptions {
            confidence,
            iou_threshold,
        })
    }
}

fn check_threshold(field: &str, value: f32) -> Result<(), ApiError> {
    if !value.is_finite() || value < MIN_THRESHOLD || value > MAX_THRESHOLD {
        return Err(ApiError::ValidationError {
            field: field.to_string(),
            message: format!(
                "{} must be between {} and {}, got {}",
                field, MIN_THRESHOLD, MAX_THRESHOLD, value
            ),
        });
    }
    Ok(())
}
