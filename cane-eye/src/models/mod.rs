//! Inference model capabilities and backends
//!
//! The fusion engine only ever sees the [`Detector`] and [`Classifier`]
//! traits. ONNX Runtime backends live behind the `onnx` feature.

pub mod store;
#[cfg(feature = "onnx")]
pub mod segmenter;
#[cfg(feature = "onnx")]
pub mod yolo;

pub use store::ModelStore;
#[cfg(feature = "onnx")]
pub use segmenter::OnnxSegmenter;
#[cfg(feature = "onnx")]
pub use yolo::YoloDetector;

use crate::error::VisionError;
use crate::frame::ColorSnapshot;
use async_trait::async_trait;
use cane_core::{NormalizedPoint, NormalizedRect};
use serde::{Deserialize, Serialize};

/// One detector hit in the sensor's landscape frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub label: String,
    pub confidence: f32,
    /// Normalized landscape rectangle
    pub rect: NormalizedRect,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, confidence: f32, rect: NormalizedRect) -> Self {
        Self {
            label: label.into(),
            confidence,
            rect,
        }
    }
}

/// Fast region detector
#[async_trait]
pub trait Detector: Send + Sync {
    /// Regions as returned by the model, in its native order
    async fn detect(&self, color: &ColorSnapshot) -> Result<Vec<RawDetection>, VisionError>;

    fn name(&self) -> &str;
}

/// Dense semantic classifier used when the detector finds nothing
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, color: &ColorSnapshot) -> Result<SegmentationMask, VisionError>;

    /// Label names, read once at startup
    fn labels(&self) -> LabelTable;

    fn name(&self) -> &str;
}

/// Index → name table for segmentation labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable(Vec<String>);

impl LabelTable {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn name(&self, index: u32) -> Option<&str> {
        self.0.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for LabelTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Dense label-index grid in the sensor's landscape frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    width: usize,
    height: usize,
    labels: Vec<u32>,
}

impl SegmentationMask {
    pub fn new(width: usize, height: usize, labels: Vec<u32>) -> Result<Self, VisionError> {
        if width == 0 || height == 0 {
            return Err(VisionError::Processing("Segmentation mask must not be empty".to_string()));
        }
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| VisionError::Processing("Segmentation mask size overflow".to_string()))?;
        if labels.len() != expected {
            return Err(VisionError::Processing(format!(
                "Segmentation mask has {} labels, expected {}x{}",
                labels.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, labels })
    }

    /// Mask with a single label everywhere
    pub fn uniform(width: usize, height: usize, label: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            labels: vec![label; width.max(1) * height.max(1)],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Label under a portrait-normalized point, using the same rotation as
    /// the depth grid.
    pub fn label_at(&self, point: NormalizedPoint) -> Option<u32> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return None;
        }
        let (lx, ly) = point.to_landscape();
        let ix = ((lx * self.width as f32) as usize).min(self.width - 1);
        let iy = ((ly * self.height as f32) as usize).min(self.height - 1);
        self.labels.get(iy * self.width + ix).copied()
    }
}
