//! Configuration for cane-eye

use crate::models::LabelTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Perception pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Detector regions below this confidence are discarded
    pub confidence_threshold: f32,
    /// Number of nearest samples averaged for a region's distance
    pub region_top_n: usize,
    /// Width (m) of the nearest-surface band above the global minimum depth
    pub cluster_band_m: f32,
    /// Frame arrivals kept by the throughput estimator
    pub fps_window: usize,
    /// Run the segmentation classifier when the detector finds nothing
    pub enable_fallback: bool,
    /// Heat-map rendering
    pub heatmap: HeatmapConfig,
    /// Model files
    pub models: ModelConfig,
}

/// Heat-map rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Depth (m) rendered as fully "far"
    pub max_depth_m: f32,
    /// Alpha channel of every rendered pixel
    pub alpha: u8,
}

/// Model file locations and decoding parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub detector_file: String,
    pub classifier_file: String,
    /// Expected SHA-256 of the detector file, hex encoded (empty = skip check)
    pub detector_sha256: String,
    /// Expected SHA-256 of the classifier file, hex encoded (empty = skip check)
    pub classifier_sha256: String,
    pub detector_input_size: u32,
    pub classifier_input_size: u32,
    pub nms_iou_threshold: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.51,
            region_top_n: 20,
            cluster_band_m: 0.03,
            fps_window: 30,
            enable_fallback: true,
            heatmap: HeatmapConfig::default(),
            models: ModelConfig::default(),
        }
    }
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            max_depth_m: 4.0,
            alpha: 180,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models"),
            detector_file: "yolo11n.onnx".to_string(),
            classifier_file: "detr_resnet50_segmentation.onnx".to_string(),
            detector_sha256: String::new(),
            classifier_sha256: String::new(),
            detector_input_size: 640,
            classifier_input_size: 512,
            nms_iou_threshold: 0.45,
        }
    }
}

impl VisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        validate_detection(self.confidence_threshold, self.region_top_n)?;
        if !self.cluster_band_m.is_finite() || self.cluster_band_m < 0.0 {
            return Err("Cluster band must be finite and non-negative".to_string());
        }
        if self.fps_window < 2 {
            return Err("FPS window must hold at least 2 samples".to_string());
        }
        self.heatmap.validate()?;
        self.models.validate()
    }
}

impl HeatmapConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.max_depth_m.is_finite() || self.max_depth_m <= 0.0 {
            return Err("Heat-map depth range must be finite and positive".to_string());
        }
        Ok(())
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.detector_input_size == 0 || self.classifier_input_size == 0 {
            return Err("Model input size must be non-zero".to_string());
        }
        if self.detector_input_size > 4096 || self.classifier_input_size > 4096 {
            return Err("Model input size too large (max 4096)".to_string());
        }
        if !(0.0..=1.0).contains(&self.nms_iou_threshold) {
            return Err("NMS IoU threshold must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

/// Startup configuration handed to the fusion engine
#[derive(Debug, Clone)]
pub struct FusionConfig {
    pub confidence_threshold: f32,
    pub region_top_n: usize,
    /// Segmentation label names, read once from the classifier at startup
    pub labels: LabelTable,
}

impl FusionConfig {
    pub fn new(vision: &VisionConfig, labels: LabelTable) -> Self {
        Self {
            confidence_threshold: vision.confidence_threshold,
            region_top_n: vision.region_top_n,
            labels,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_detection(self.confidence_threshold, self.region_top_n)
    }
}

fn validate_detection(confidence_threshold: f32, region_top_n: usize) -> Result<(), String> {
    if !confidence_threshold.is_finite() || !(0.0..=1.0).contains(&confidence_threshold) {
        return Err("Confidence threshold must be within [0, 1]".to_string());
    }
    if region_top_n == 0 {
        return Err("Region top-N must be at least 1".to_string());
    }
    Ok(())
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self::new(&VisionConfig::default(), LabelTable::default())
    }
}
