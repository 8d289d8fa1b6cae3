// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wire schema for detection results

use serde::{Deserialize, Serialize};

use crate::detector::{self, BoundingBox};

/// One detected object as returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl From<detector::Detection> for Detection {
    fn from(det: detector::Detection) -> Self {
        Self {
            class_name: det.class_name,
            confidence: det.confidence,
            bbox: det.bbox,
        }
    }
}

/// Dimensions of the source image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Full detection response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub request_id: String,
    pub detections: Vec<Detection>,
    /// Always equal to `detections.len()`
    pub count: usize,
    /// Seconds, rounded to milliseconds
    pub processing_time: f64,
    pub image_size: ImageSize,
}

impl DetectionResponse {
    /// Build a response; `count` is derived from the detection list so the
    /// invariant `count == detections.len()` holds by construction.
    pub fn new(
        request_id: String,
        detections: Vec<Detection>,
        processing_time: f64,
        image_size: ImageSize,
    ) -> Self {
        let count = detections.len();
        Self {
            request_id,
            detections,
            count,
            processing_time: (processing_time * 1000.0).round() / 1000.0,
            image_size,
        }
    }
}
