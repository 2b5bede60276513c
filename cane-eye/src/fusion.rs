//! Detection fusion
//!
//! Runs the fast detector on every accepted frame and binds each surviving
//! region to a depth estimate. When the detector yields nothing, the dense
//! classifier runs instead and refreshes the segmentation mask that the
//! description composer falls back on.

use crate::config::FusionConfig;
use crate::depth::region_estimate;
use crate::error::VisionError;
use crate::frame::FrameSnapshot;
use crate::models::{Classifier, Detector, LabelTable, RawDetection, SegmentationMask};
use cane_core::NormalizedRect;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A detector region in portrait space, with its nearest-surface distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRegion {
    pub label: String,
    pub confidence: f32,
    pub rect: NormalizedRect,
    pub distance: Option<f32>,
}

/// Which stage produced the frame's labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionPath {
    Detected,
    /// Detector was empty, classifier ran (successfully or not)
    Fallback,
    /// Detector was empty and no classifier is loaded
    FallbackUnavailable,
}

#[derive(Debug, Clone)]
pub struct FusionOutput {
    /// Detector output order
    pub regions: Vec<DetectionRegion>,
    pub path: FusionPath,
    /// Most recent mask, possibly from an earlier frame
    pub mask: Option<Arc<SegmentationMask>>,
    /// Detector dispatch to completion
    pub inference_latency: Duration,
}

pub struct FusionEngine {
    config: Arc<FusionConfig>,
    labels: LabelTable,
    detector: Arc<dyn Detector>,
    classifier: Option<Arc<dyn Classifier>>,
    latest_mask: RwLock<Option<Arc<SegmentationMask>>>,
}

impl FusionEngine {
    pub fn new(config: Arc<FusionConfig>, detector: Arc<dyn Detector>) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        Ok(Self {
            labels: config.labels.clone(),
            config,
            detector,
            classifier: None,
            latest_mask: RwLock::new(None),
        })
    }

    /// Attach the fallback classifier. A failed load leaves the engine
    /// detector-only for its whole lifetime.
    pub fn with_fallback(mut self, classifier: Result<Arc<dyn Classifier>, VisionError>) -> Self {
        match classifier {
            Ok(classifier) => {
                if self.labels.is_empty() {
                    self.labels = classifier.labels();
                }
                info!(
                    "Fallback classifier '{}' attached ({} labels)",
                    classifier.name(),
                    self.labels.len()
                );
                self.classifier = Some(classifier);
            }
            Err(e) => {
                warn!("Fallback classifier unavailable, running detector-only: {}", e);
                self.classifier = None;
            }
        }
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn latest_mask(&self) -> Option<Arc<SegmentationMask>> {
        self.latest_mask.read().clone()
    }

    /// Detector errors abort the frame. Classifier errors only keep the
    /// previous mask.
    pub async fn fuse(&self, frame: &FrameSnapshot) -> Result<FusionOutput, VisionError> {
        let started = Instant::now();
        let raw = self.detector.detect(&frame.color).await?;
        let inference_latency = started.elapsed();

        let regions = self.bind_regions(raw, frame);
        debug!(
            "Frame {}: {} regions from '{}' in {:?}",
            frame.id,
            regions.len(),
            self.detector.name(),
            inference_latency
        );

        if !regions.is_empty() {
            return Ok(FusionOutput {
                regions,
                path: FusionPath::Detected,
                mask: self.latest_mask(),
                inference_latency,
            });
        }

        let Some(classifier) = &self.classifier else {
            return Ok(FusionOutput {
                regions,
                path: FusionPath::FallbackUnavailable,
                mask: None,
                inference_latency,
            });
        };

        match classifier.classify(&frame.color).await {
            Ok(mask) => {
                debug!("Frame {}: classifier mask {}x{}", frame.id, mask.width(), mask.height());
                *self.latest_mask.write() = Some(Arc::new(mask));
            }
            Err(e) => warn!("Frame {}: classifier failed, keeping previous mask: {}", frame.id, e),
        }

        Ok(FusionOutput {
            regions,
            path: FusionPath::Fallback,
            mask: self.latest_mask(),
            inference_latency,
        })
    }

    fn bind_regions(&self, raw: Vec<RawDetection>, frame: &FrameSnapshot) -> Vec<DetectionRegion> {
        raw.into_iter()
            .filter(|d| d.confidence.is_finite() && d.confidence >= self.config.confidence_threshold)
            .filter_map(|d| {
                let rect = d.rect.landscape_to_portrait().clamped()?;
                let distance = frame
                    .depth
                    .as_ref()
                    .and_then(|grid| region_estimate(grid, &rect, self.config.region_top_n));
                Some(DetectionRegion {
                    label: d.label,
                    confidence: d.confidence.min(1.0),
                    rect,
                    distance,
                })
            })
            .collect()
    }
}
