//! Scripted sensor scenarios
//!
//! A scenario describes a short sequence of synthetic frames: a depth grid
//! built from a background plus rectangular patches, what the detector
//! "sees" on that frame, and which label the classifier would paint. The
//! frame index travels inside the color buffer, so the scripted models can
//! answer for exactly the frame the pipeline is processing.

use anyhow::{bail, Context};
use async_trait::async_trait;
use cane_eye::models::{Classifier, Detector, LabelTable, RawDetection, SegmentationMask};
use cane_eye::{ColorSnapshot, DepthGrid, VisionError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Color frames are gray, at least 4 pixels wide to carry the frame index
const MIN_COLOR_WIDTH: u32 = 4;
/// Largest depth grid or color frame a scenario may describe (4096x4096)
const MAX_FRAME_SAMPLES: usize = 4096 * 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Depth grid size, landscape
    pub width: usize,
    pub height: usize,
    #[serde(default = "default_color_size")]
    pub color_width: u32,
    #[serde(default = "default_color_size")]
    pub color_height: u32,
    /// Segmentation label names
    #[serde(default)]
    pub labels: Vec<String>,
    /// Simulated detector latency
    #[serde(default)]
    pub detector_delay_ms: u64,
    /// Simulated classifier latency
    #[serde(default)]
    pub classifier_delay_ms: u64,
    pub frames: Vec<ScenarioFrame>,
}

fn default_color_size() -> u32 {
    16
}

fn default_repeat() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFrame {
    /// Depth everywhere outside the patches; 0 means no reading
    pub background: f32,
    #[serde(default)]
    pub patches: Vec<Patch>,
    /// Landscape detections returned by the detector
    #[serde(default)]
    pub detections: Vec<RawDetection>,
    /// Label index the classifier paints over the whole frame
    #[serde(default)]
    pub classified: Option<u32>,
    /// Frame has no depth buffer
    #[serde(default)]
    pub no_depth: bool,
    /// Number of consecutive sensor frames with this content
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

/// Rectangular patch in grid cells
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Patch {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub depth: f32,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let scenario: Scenario = cane_core::config::load_from_path(path)
            .with_context(|| format!("Failed to load scenario {}", path.display()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("Scenario depth grid must not be empty");
        }
        if self.color_width < MIN_COLOR_WIDTH || self.color_height == 0 {
            bail!("Scenario color frame must be at least {}x1", MIN_COLOR_WIDTH);
        }
        let depth_samples = self.width.checked_mul(self.height);
        let color_samples = (self.color_width as usize).checked_mul(self.color_height as usize);
        for (what, samples) in [("depth grid", depth_samples), ("color frame", color_samples)] {
            if !samples.is_some_and(|n| n <= MAX_FRAME_SAMPLES) {
                bail!("Scenario {} exceeds {} samples", what, MAX_FRAME_SAMPLES);
            }
        }
        if self.frames.is_empty() {
            bail!("Scenario has no frames");
        }
        for (i, frame) in self.frames.iter().enumerate() {
            if frame.repeat == 0 {
                bail!("Frame {} repeats zero times", i);
            }
            for det in &frame.detections {
                if !det.rect.is_finite() {
                    bail!("Frame {} has a non-finite detection rectangle", i);
                }
            }
        }
        Ok(())
    }

    pub fn label_table(&self) -> LabelTable {
        LabelTable::new(self.labels.clone())
    }

    /// Scenario frame indices in sensor order, repeats expanded
    pub fn schedule(&self) -> Vec<usize> {
        self.frames
            .iter()
            .enumerate()
            .flat_map(|(i, f)| std::iter::repeat(i).take(f.repeat))
            .collect()
    }

    /// Depth grid of frame `index`, `None` for frames without depth
    pub fn depth_grid(&self, index: usize) -> anyhow::Result<Option<DepthGrid>> {
        let frame = self
            .frames
            .get(index)
            .with_context(|| format!("Scenario has no frame {}", index))?;
        if frame.no_depth {
            return Ok(None);
        }
        let mut grid = DepthGrid::filled(self.width, self.height, frame.background)?;
        for patch in &frame.patches {
            grid.fill_rect(patch.x, patch.y, patch.width, patch.height, patch.depth);
        }
        Ok(Some(grid))
    }

    /// Gray color buffer with the frame index in its first four bytes
    pub fn color_buffer(&self, index: usize) -> Vec<u8> {
        let mut data = vec![0u8; self.color_width as usize * self.color_height as usize];
        data[..4].copy_from_slice(&(index as u32).to_le_bytes());
        data
    }
}

fn frame_index(color: &ColorSnapshot) -> Result<usize, VisionError> {
    let bytes = color
        .data()
        .get(..4)
        .ok_or_else(|| VisionError::Inference("Color frame too small for a frame index".to_string()))?;
    let mut index = [0u8; 4];
    index.copy_from_slice(bytes);
    Ok(u32::from_le_bytes(index) as usize)
}

/// Detector replaying the scenario's detections
pub struct ScriptedDetector {
    scenario: Arc<Scenario>,
    delay: Duration,
}

impl ScriptedDetector {
    pub fn new(scenario: Arc<Scenario>) -> Self {
        let delay = Duration::from_millis(scenario.detector_delay_ms);
        Self { scenario, delay }
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    async fn detect(&self, color: &ColorSnapshot) -> Result<Vec<RawDetection>, VisionError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let index = frame_index(color)?;
        self.scenario
            .frames
            .get(index)
            .map(|f| f.detections.clone())
            .ok_or_else(|| VisionError::Inference(format!("Unknown scenario frame {}", index)))
    }

    fn name(&self) -> &str {
        "scripted-detector"
    }
}

/// Classifier painting the scenario's label over the whole frame
pub struct ScriptedClassifier {
    scenario: Arc<Scenario>,
    delay: Duration,
}

impl ScriptedClassifier {
    pub fn new(scenario: Arc<Scenario>) -> Self {
        let delay = Duration::from_millis(scenario.classifier_delay_ms);
        Self { scenario, delay }
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, color: &ColorSnapshot) -> Result<SegmentationMask, VisionError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let index = frame_index(color)?;
        let frame = self
            .scenario
            .frames
            .get(index)
            .ok_or_else(|| VisionError::Inference(format!("Unknown scenario frame {}", index)))?;
        match frame.classified {
            Some(label) => Ok(SegmentationMask::uniform(self.scenario.width, self.scenario.height, label)),
            None => Err(VisionError::Inference(format!("No classification scripted for frame {}", index))),
        }
    }

    fn labels(&self) -> LabelTable {
        self.scenario.label_table()
    }

    fn name(&self) -> &str {
        "scripted-classifier"
    }
}
