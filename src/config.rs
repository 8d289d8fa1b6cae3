// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration parsed from environment variables

use std::env;
use std::path::PathBuf;

use crate::detector::yolo::YoloConfig;

/// Runtime configuration for the detection node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the HTTP server binds to
    pub api_host: String,
    /// Port the HTTP server binds to
    pub api_port: u16,
    /// Path to the ONNX detection model
    pub model_path: PathBuf,
    /// Square input size the model expects (pixels)
    pub model_input_size: u32,
    /// Upper bound on detections returned per request
    pub max_detections: usize,
    /// Optional TTF font for label text on annotated images
    pub label_font_path: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            model_path: PathBuf::from("./models/yolov8n.onnx"),
            model_input_size: 640,
            max_detections: 300,
            label_font_path: None,
        }
    }
}

impl NodeConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_host = env::var("API_HOST").unwrap_or(defaults.api_host);
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults.api_port);
        let model_path = env::var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);
        let model_input_size = env::var("MODEL_INPUT_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.model_input_size);
        let max_detections = env::var("MAX_DETECTIONS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.max_detections);
        let label_font_path = env::var("LABEL_FONT_PATH").ok().map(PathBuf::from);

        Self {
            api_host,
            api_port,
            model_path,
            model_input_size,
            max_detections,
            label_font_path,
        }
    }

    /// Detector backend configuration derived from the node configuration
    pub fn yolo_config(&self) -> YoloConfig {
        YoloConfig {
            model_path: self.model_path.clone(),
            input_size: self.model_input_size,
            max_detections: self.max_detections,
            label_font_path: self.label_font_path.clone(),
        }
    }
}
