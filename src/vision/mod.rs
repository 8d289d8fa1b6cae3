// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image decoding and re-encoding for uploaded files

pub mod image_utils;

pub use image_utils::{
    decode_image_bytes, detect_format, encode_image, format_to_extension, format_to_mime,
    ImageError, ImageInfo, MAX_IMAGE_SIZE,
};
