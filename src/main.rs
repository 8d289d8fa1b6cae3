// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use std::{env, sync::Arc};

use vision_node::api::{start_server, ApiConfig, AppState};
use vision_node::config::NodeConfig;
use vision_node::detector::yolo::YoloDetector;
use vision_node::detector::ObjectDetector;
use vision_node::version;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    tracing::info!("Starting {}", version::get_version_string());

    let config = NodeConfig::from_env();
    tracing::info!(
        "Loading detection model from {}",
        config.model_path.display()
    );

    // A failed load leaves the service in degraded mode: health and root
    // stay up, detection endpoints answer 503.
    let detector: Option<Arc<dyn ObjectDetector>> = match YoloDetector::load(&config.yolo_config())
    {
        Ok(detector) => {
            tracing::info!("Object detector initialized");
            Some(Arc::new(detector))
        }
        Err(e) => {
            tracing::error!("Failed to initialize detector: {}", e);
            None
        }
    };

    let state = AppState::new(detector);
    let api_config = ApiConfig {
        host: config.api_host.clone(),
        port: config.api_port,
    };

    start_server(&api_config, state).await
}
