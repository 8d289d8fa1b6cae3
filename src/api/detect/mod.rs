// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection endpoints

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{detect_annotated_handler, detect_handler};
pub use request::DetectQuery;
pub use response::{Detection, DetectionResponse, ImageSize};
