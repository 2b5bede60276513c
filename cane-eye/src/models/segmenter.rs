//! Dense semantic segmenter (ONNX Runtime)

use super::{Classifier, LabelTable, SegmentationMask};
use crate::config::ModelConfig;
use crate::error::VisionError;
use crate::frame::ColorSnapshot;
use crate::utils::{argmax, snapshot_to_chw_tensor};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Model metadata key holding the label names
const LABELS_METADATA_KEY: &str = "labels";

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Segmenter producing either `[1, C, H, W]` logits or a `[1, H, W]` label map
#[derive(Clone)]
pub struct OnnxSegmenter {
    session: Arc<Mutex<Session>>,
    labels: LabelTable,
    input_size: u32,
}

impl OnnxSegmenter {
    pub fn load(model_path: &Path, config: &ModelConfig) -> Result<Self, VisionError> {
        let session = Session::builder()
            .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load segmentation model: {}", e)))?;

        let labels = match session
            .metadata()
            .and_then(|m| m.custom(LABELS_METADATA_KEY))
        {
            Ok(Some(raw)) => parse_labels(&raw)?,
            Ok(None) => {
                warn!("Segmentation model has no '{}' metadata, labels unavailable", LABELS_METADATA_KEY);
                LabelTable::default()
            }
            Err(e) => return Err(VisionError::Ort(format!("Failed to read model metadata: {}", e))),
        };

        info!("Segmentation model loaded from {:?} ({} labels)", model_path, labels.len());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            labels,
            input_size: config.classifier_input_size,
        })
    }

    fn infer(&self, color: &ColorSnapshot) -> Result<SegmentationMask, VisionError> {
        let size = self.input_size as usize;
        let input = snapshot_to_chw_tensor(color, self.input_size, IMAGENET_MEAN, IMAGENET_STD)?;
        let tensor = Tensor::from_array(([1usize, 3, size, size], input))
            .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))?;

        let (shape, data) = {
            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![tensor])
                .map_err(|e| VisionError::Ort(format!("Segmentation inference failed: {}", e)))?;
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| VisionError::Ort(format!("Failed to extract output tensor: {}", e)))?;
            (shape.to_vec(), data.to_vec())
        };
        debug!("Segmentation output shape: {:?}", shape);

        let dims: Vec<usize> = shape.iter().map(|d| (*d).max(0) as usize).collect();
        mask_from_output(&dims, &data)
    }
}

/// Accepts `["a", "b"]` or `{"labels": ["a", "b"]}`
pub fn parse_labels(raw: &str) -> Result<LabelTable, VisionError> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Labels {
        List(Vec<String>),
        Wrapped { labels: Vec<String> },
    }

    match serde_json::from_str::<Labels>(raw) {
        Ok(Labels::List(names)) | Ok(Labels::Wrapped { labels: names }) => Ok(LabelTable::new(names)),
        Err(e) => Err(VisionError::Model(format!("Invalid label metadata: {}", e))),
    }
}

fn mask_from_output(dims: &[usize], data: &[f32]) -> Result<SegmentationMask, VisionError> {
    match *dims {
        [1, classes, height, width] if classes > 0 => {
            let plane = height * width;
            if data.len() < classes * plane {
                return Err(VisionError::Inference("Segmentation output truncated".to_string()));
            }
            let labels = (0..plane)
                .map(|i| {
                    argmax((0..classes).map(|c| data[c * plane + i]))
                        .map(|(c, _)| c as u32)
                        .unwrap_or(0)
                })
                .collect();
            SegmentationMask::new(width, height, labels)
        }
        [1, height, width] => {
            let labels = data
                .iter()
                .take(height * width)
                .map(|v| if v.is_finite() && *v >= 0.0 { *v as u32 } else { 0 })
                .collect();
            SegmentationMask::new(width, height, labels)
        }
        _ => Err(VisionError::Inference(format!(
            "Unexpected segmentation output shape {:?}",
            dims
        ))),
    }
}

#[async_trait]
impl Classifier for OnnxSegmenter {
    async fn classify(&self, color: &ColorSnapshot) -> Result<SegmentationMask, VisionError> {
        let segmenter = self.clone();
        let color = color.clone();
        tokio::task::spawn_blocking(move || segmenter.infer(&color))
            .await
            .map_err(|e| VisionError::Inference(format!("Segmentation task failed: {}", e)))?
    }

    fn labels(&self) -> LabelTable {
        self.labels.clone()
    }

    fn name(&self) -> &str {
        "onnx-segmenter"
    }
}
