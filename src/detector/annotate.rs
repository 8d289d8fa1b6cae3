// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bounding box and label drawing for annotated responses

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgba};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use super::Detection;

const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 16.0;
const LABEL_PAD: i32 = 2;

// Distinct colors cycled by class id so the same class always gets the
// same color across requests.
const PALETTE: &[Rgba<u8>] = &[
    Rgba([230, 57, 70, 255]),
    Rgba([46, 196, 182, 255]),
    Rgba([255, 159, 28, 255]),
    Rgba([69, 123, 157, 255]),
    Rgba([144, 190, 109, 255]),
    Rgba([247, 37, 133, 255]),
    Rgba([67, 97, 238, 255]),
    Rgba([251, 197, 49, 255]),
    Rgba([0, 168, 120, 255]),
    Rgba([155, 93, 229, 255]),
];

/// Stable color for a class id.
pub fn class_color(class_id: usize) -> Rgba<u8> {
    PALETTE[class_id % PALETTE.len()]
}

/// Draw detection boxes (and labels, when a font is available) onto a copy
/// of the image.
pub fn draw_detections(
    image: &DynamicImage,
    detections: &[Detection],
    font: Option<&FontVec>,
) -> DynamicImage {
    let mut canvas = image.to_rgba8();
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);

    for det in detections {
        let color = class_color(det.class_id);

        let x = (det.bbox.x1 as i32).clamp(0, width.saturating_sub(1));
        let y = (det.bbox.y1 as i32).clamp(0, height.saturating_sub(1));
        let w = (det.bbox.width() as i32).clamp(1, width - x);
        let h = (det.bbox.height() as i32).clamp(1, height - y);

        for inset in 0..BOX_THICKNESS {
            let rw = w - 2 * inset;
            let rh = h - 2 * inset;
            if rw <= 0 || rh <= 0 {
                break;
            }
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(x + inset, y + inset).of_size(rw as u32, rh as u32),
                color,
            );
        }

        if let Some(font) = font {
            let label = format!("{} {:.2}", det.class_name, det.confidence);
            let scale = PxScale::from(LABEL_SCALE);
            let text_h = LABEL_SCALE as i32 + 2 * LABEL_PAD;
            // Place the tag above the box when it fits, inside otherwise.
            let tag_y = if y >= text_h { y - text_h } else { y };
            let tag_w = ((label.len() as f32 * LABEL_SCALE * 0.55) as i32)
                .clamp(1, width - x)
                .max(1);
            draw_filled_rect_mut(
                &mut canvas,
                Rect::at(x, tag_y).of_size(tag_w as u32, text_h as u32),
                color,
            );
            draw_text_mut(
                &mut canvas,
                Rgba([255, 255, 255, 255]),
                x + LABEL_PAD,
                tag_y + LABEL_PAD,
                scale,
                font,
                &label,
            );
        }
    }

    DynamicImage::ImageRgba8(canvas)
}
