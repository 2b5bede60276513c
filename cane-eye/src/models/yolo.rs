//! YOLO object detector (ONNX Runtime)

use super::{Detector, RawDetection};
use crate::config::ModelConfig;
use crate::error::VisionError;
use crate::frame::ColorSnapshot;
use crate::utils::{argmax, snapshot_to_chw_tensor};
use async_trait::async_trait;
use cane_core::NormalizedRect;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Candidates below this score never reach NMS; the fusion engine applies
/// the configured confidence threshold afterwards.
const MIN_CANDIDATE_SCORE: f32 = 0.25;

/// YOLOv8 / YOLO11 detector with `[1, 4 + C, N]` output
#[derive(Clone)]
pub struct YoloDetector {
    session: Arc<Mutex<Session>>,
    input_size: u32,
    nms_iou_threshold: f32,
}

impl YoloDetector {
    pub fn load(model_path: &Path, config: &ModelConfig) -> Result<Self, VisionError> {
        let session = Session::builder()
            .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model: {}", e)))?;

        info!("YOLO model loaded from {:?}", model_path);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_size: config.detector_input_size,
            nms_iou_threshold: config.nms_iou_threshold,
        })
    }

    fn infer(&self, color: &ColorSnapshot) -> Result<Vec<RawDetection>, VisionError> {
        let size = self.input_size as usize;
        let input = snapshot_to_chw_tensor(color, self.input_size, [0.0; 3], [1.0; 3])?;
        let tensor = Tensor::from_array(([1usize, 3, size, size], input))
            .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))?;

        let (shape, data) = {
            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![tensor])
                .map_err(|e| VisionError::Ort(format!("YOLO inference failed: {}", e)))?;
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| VisionError::Ort(format!("Failed to extract output tensor: {}", e)))?;
            (shape.to_vec(), data.to_vec())
        };
        debug!("YOLO output shape: {:?}", shape);

        if shape.len() != 3 || shape[1] < 5 {
            return Err(VisionError::Inference(format!("Unexpected YOLO output shape {:?}", shape)));
        }
        let rows = shape[1] as usize;
        let anchors = shape[2] as usize;
        if data.len() < rows * anchors {
            return Err(VisionError::Inference("YOLO output truncated".to_string()));
        }

        let candidates = decode(&data, rows, anchors, self.input_size as f32);
        Ok(non_max_suppression(candidates, self.nms_iou_threshold))
    }
}

/// Decode `[4 + C, N]` rows (cx, cy, w, h in input pixels, then class
/// scores) into normalized landscape detections.
fn decode(data: &[f32], rows: usize, anchors: usize, input_size: f32) -> Vec<RawDetection> {
    let at = |row: usize, i: usize| data[row * anchors + i];
    let mut out = Vec::new();
    for i in 0..anchors {
        let Some((class, score)) = argmax((4..rows).map(|r| at(r, i))) else {
            continue;
        };
        if score < MIN_CANDIDATE_SCORE {
            continue;
        }
        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        let rect = NormalizedRect::new(
            (cx - w / 2.0) / input_size,
            (cy - h / 2.0) / input_size,
            w / input_size,
            h / input_size,
        );
        let Some(rect) = rect.clamped() else {
            continue;
        };
        let label = COCO_CLASSES
            .get(class)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("class {}", class));
        out.push(RawDetection::new(label, score, rect));
    }
    out
}

/// Greedy per-label NMS, highest score first
fn non_max_suppression(mut candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<RawDetection> = Vec::new();
    for candidate in candidates {
        let overlaps = kept
            .iter()
            .any(|k| k.label == candidate.label && k.rect.iou(&candidate.rect) > iou_threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

#[async_trait]
impl Detector for YoloDetector {
    async fn detect(&self, color: &ColorSnapshot) -> Result<Vec<RawDetection>, VisionError> {
        let detector = self.clone();
        let color = color.clone();
        tokio::task::spawn_blocking(move || detector.infer(&color))
            .await
            .map_err(|e| VisionError::Inference(format!("YOLO task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "yolo"
    }
}
