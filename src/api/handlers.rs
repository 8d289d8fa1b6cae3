// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::detector::ModelDescriptor;
use crate::version;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub model_loaded: bool,
    pub version: String,
}

impl HealthResponse {
    pub fn new(model_loaded: bool) -> Self {
        Self {
            status: if model_loaded { "healthy" } else { "unhealthy" }.to_string(),
            model: "YOLOv8".to_string(),
            model_loaded,
            version: version::VERSION_NUMBER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub name: String,
    pub model_type: String,
    pub task: String,
    pub input_size: u32,
    pub class_count: usize,
    pub classes: Vec<String>,
}

impl From<ModelDescriptor> for ModelInfoResponse {
    fn from(descriptor: ModelDescriptor) -> Self {
        Self {
            name: descriptor.name,
            model_type: descriptor.model_type,
            task: descriptor.task,
            input_size: descriptor.input_size,
            class_count: descriptor.classes.len(),
            classes: descriptor.classes.iter().map(|c| c.to_string()).collect(),
        }
    }
}
