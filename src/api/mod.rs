// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod errors;
pub mod handlers;
pub mod http_server;

pub use detect::{detect_annotated_handler, detect_handler, DetectQuery, DetectionResponse};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, ModelInfoResponse};
pub use http_server::{create_app, start_server, ApiConfig, AppState};
