// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod detector;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{ApiError, ErrorResponse};
pub use config::NodeConfig;
pub use detector::{
    BoundingBox, DetectOptions, Detection, DetectorError, ModelDescriptor, ObjectDetector,
};
