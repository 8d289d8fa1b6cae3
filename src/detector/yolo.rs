// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime backend for pretrained YOLOv8 detection models

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Mutex;

use ab_glyph::FontVec;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{s, Array4, ArrayView2, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;

use super::annotate::draw_detections;
use super::classes::{class_name, COCO_CLASSES};
use super::{BoundingBox, DetectOptions, Detection, DetectorError, ModelDescriptor, ObjectDetector};

/// Configuration for the YOLO backend
#[derive(Debug, Clone)]
pub struct YoloConfig {
    pub model_path: PathBuf,
    pub input_size: u32,
    pub max_detections: usize,
    pub label_font_path: Option<PathBuf>,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/yolov8n.onnx"),
            input_size: 640,
            max_detections: 300,
            label_font_path: None,
        }
    }
}

/// Pretrained YOLOv8 detector running on ONNX Runtime.
///
/// The ort session needs exclusive access to run, so it sits behind a
/// mutex; concurrent requests serialize on inference.
pub struct YoloDetector {
    session: Mutex<Session>,
    model_name: String,
    input_size: u32,
    max_detections: usize,
    font: Option<FontVec>,
}

impl YoloDetector {
    /// Load the ONNX model from disk. CUDA is used when available,
    /// otherwise inference falls back to CPU.
    pub fn load(config: &YoloConfig) -> Result<Self, DetectorError> {
        let mut builder = Session::builder()
            .and_then(|b| b.with_intra_threads(4))
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))?;

        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = with_cuda;
        }

        let model_bytes = std::fs::read(&config.model_path).map_err(|e| {
            DetectorError::ModelLoad(format!("{}: {}", config.model_path.display(), e))
        })?;
        let session = builder
            .commit_from_memory(&model_bytes)
            .map_err(|e| DetectorError::ModelLoad(e.to_string()))?;

        let model_name = config
            .model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolov8".to_string());

        let font = config.label_font_path.as_ref().and_then(|path| {
            match std::fs::read(path).map(FontVec::try_from_vec) {
                Ok(Ok(font)) => Some(font),
                Ok(Err(e)) => {
                    tracing::warn!("Invalid label font {}: {}", path.display(), e);
                    None
                }
                Err(e) => {
                    tracing::warn!("Cannot read label font {}: {}", path.display(), e);
                    None
                }
            }
        });
        if font.is_none() {
            tracing::warn!("No label font loaded; annotated images get boxes only");
        }

        Ok(Self {
            session: Mutex::new(session),
            model_name,
            input_size: config.input_size,
            max_detections: config.max_detections,
            font,
        })
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(
        &self,
        image: &DynamicImage,
        opts: &DetectOptions,
    ) -> Result<Vec<Detection>, DetectorError> {
        let rgb = image.to_rgb8();
        let imgsz = self.input_size as usize;
        let resized = image::imageops::resize(&rgb, self.input_size, self.input_size, FilterType::Nearest);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1i64, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Value::from_array((input_shape, input.into_raw_vec()))
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectorError::Inference("model session poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let (out_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        let dims: Vec<usize> = out_shape.iter().map(|&d| d as usize).collect();
        if dims.len() != 3 || dims[1] <= 4 {
            return Err(DetectorError::InvalidOutput(format!(
                "expected [1, 4+classes, candidates] output, got {:?}",
                dims
            )));
        }

        let view = ArrayViewD::from_shape(IxDyn(&dims), data)
            .map_err(|e| DetectorError::InvalidOutput(e.to_string()))?;
        let view = view.index_axis(Axis(0), 0);
        let view = view
            .into_dimensionality::<ndarray::Ix2>()
            .map_err(|e| DetectorError::InvalidOutput(e.to_string()))?;

        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;

        let candidates = decode_predictions(view, opts, sx, sy);
        let mut detections = non_max_suppression(candidates, opts.iou_threshold);
        detections.truncate(self.max_detections);
        Ok(detections)
    }

    fn annotate(
        &self,
        image: &DynamicImage,
        detections: &[Detection],
    ) -> Result<DynamicImage, DetectorError> {
        Ok(draw_detections(image, detections, self.font.as_ref()))
    }

    fn info(&self) -> ModelDescriptor {
        ModelDescriptor {
            name: self.model_name.clone(),
            model_type: "YOLOv8".to_string(),
            task: "detect".to_string(),
            input_size: self.input_size,
            classes: COCO_CLASSES,
        }
    }
}

/// Decode a raw YOLOv8 `[4+classes, candidates]` prediction view into
/// detections above the confidence threshold, scaled to source pixels.
fn decode_predictions(
    view: ArrayView2<'_, f32>,
    opts: &DetectOptions,
    sx: f32,
    sy: f32,
) -> Vec<Detection> {
    let num_candidates = view.shape()[1];
    let mut detections = Vec::new();

    for i in 0..num_candidates {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, &max_score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        else {
            continue;
        };

        if max_score < opts.confidence {
            continue;
        }

        let cx = view[[0, i]];
        let cy = view[[1, i]];
        let w = view[[2, i]];
        let h = view[[3, i]];

        detections.push(Detection {
            class_id,
            class_name: class_name(class_id).to_string(),
            confidence: max_score,
            bbox: BoundingBox {
                x1: (cx - w / 2.0) * sx,
                y1: (cy - h / 2.0) * sy,
                x2: (cx + w / 2.0) * sx,
                y2: (cy + h / 2.0) * sy,
            },
        });
    }

    detections
}

/// Class-aware non-maximum suppression. Returns the surviving detections
/// sorted by descending confidence.
fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_unstable_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    'candidates: for det in detections {
        for kept in &keep {
            if kept.class_id == det.class_id && kept.bbox.iou(&det.bbox) > iou_threshold {
                continue 'candidates;
            }
        }
        keep.push(det);
    }
    keep
}
