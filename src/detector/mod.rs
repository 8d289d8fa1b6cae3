// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection capability interface
//!
//! The HTTP layer only ever talks to the [`ObjectDetector`] trait, so the
//! pretrained backend can be swapped or mocked without touching request
//! handling.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod annotate;
pub mod classes;
pub mod yolo;

/// Errors raised by a detector backend
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unexpected model output: {0}")]
    InvalidOutput(String),
}

/// Axis-aligned bounding box in source image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge
    pub x1: f32,
    /// Top edge
    pub y1: f32,
    /// Right edge
    pub x2: f32,
    /// Bottom edge
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box, in [0, 1]
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// One recognized object instance
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Index into the class taxonomy
    pub class_id: usize,
    /// Human-readable class label
    pub class_name: String,
    /// Confidence score in [0, 1]
    pub confidence: f32,
    /// Box in source image pixels
    pub bbox: BoundingBox,
}

/// Per-request thresholds passed through to the backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectOptions {
    /// Minimum confidence for a detection to be reported
    pub confidence: f32,
    /// IOU threshold used for non-maximum suppression
    pub iou_threshold: f32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            confidence: 0.5,
            iou_threshold: 0.45,
        }
    }
}

/// Static description of the loaded model
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    /// Model identifier (e.g. file stem of the weights)
    pub name: String,
    /// Model family (e.g. "YOLOv8")
    pub model_type: String,
    /// Task the model performs
    pub task: String,
    /// Square input size in pixels
    pub input_size: u32,
    /// Fixed class taxonomy
    pub classes: &'static [&'static str],
}

/// Capability interface for a pretrained object detector.
///
/// Implementations must be safe to share across concurrent requests; a
/// non-reentrant backend serializes access internally.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectDetector: Send + Sync {
    /// Run detection on a decoded image. Every returned detection satisfies
    /// `confidence >= opts.confidence` and carries a taxonomy class name.
    fn detect(
        &self,
        image: &DynamicImage,
        opts: &DetectOptions,
    ) -> Result<Vec<Detection>, DetectorError>;

    /// Return a copy of the image with boxes and labels drawn.
    fn annotate(
        &self,
        image: &DynamicImage,
        detections: &[Detection],
    ) -> Result<DynamicImage, DetectorError>;

    /// Static model metadata.
    fn info(&self) -> ModelDescriptor;
}
