//! Shared doubles and synthetic frames for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use cane_eye::models::{Classifier, Detector, LabelTable, RawDetection, SegmentationMask};
use cane_eye::{ColorSnapshot, ColorView, DepthGrid, DepthView, PixelFormat, VisionError};
use cane_haptic::{Actuator, Pulse};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub const COLOR_W: u32 = 8;
pub const COLOR_H: u32 = 6;

pub fn color_pixels() -> Vec<u8> {
    vec![128u8; (COLOR_W * COLOR_H * 3) as usize]
}

pub fn color_view(pixels: &[u8]) -> ColorView<'_> {
    ColorView::packed(COLOR_W, COLOR_H, PixelFormat::Rgb8, pixels)
}

pub fn depth_view(grid: &DepthGrid) -> DepthView<'_> {
    DepthView::packed(grid.width(), grid.height(), grid.as_slice())
}

/// `size`×`size` background with a square patch at (x, y)
pub fn grid_with_patch(size: usize, background: f32, x: usize, y: usize, patch: usize, depth: f32) -> DepthGrid {
    let mut grid = DepthGrid::filled(size, size, background).unwrap();
    grid.fill_rect(x, y, patch, patch, depth);
    grid
}

#[derive(Default)]
pub struct RecordingActuator {
    pub pulses: Mutex<Vec<Pulse>>,
    pub cues: AtomicUsize,
}

impl RecordingActuator {
    pub fn strong_count(&self) -> usize {
        self.pulses.lock().iter().filter(|p| **p == Pulse::Strong).count()
    }

    pub fn cue_count(&self) -> usize {
        self.cues.load(Ordering::SeqCst)
    }
}

impl Actuator for RecordingActuator {
    fn pulse(&self, intensity: Pulse) {
        self.pulses.lock().push(intensity);
    }

    fn audible_cue(&self) {
        self.cues.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Returns a fixed detection list on every call
pub struct StaticDetector {
    pub detections: Vec<RawDetection>,
    pub calls: AtomicUsize,
}

impl StaticDetector {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self {
            detections,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Detector for StaticDetector {
    async fn detect(&self, _color: &ColorSnapshot) -> Result<Vec<RawDetection>, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Fails every detect call, as a model that cannot be dispatched
pub struct FailingDetector {
    pub calls: AtomicUsize,
}

impl FailingDetector {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Detector for FailingDetector {
    async fn detect(&self, _color: &ColorSnapshot) -> Result<Vec<RawDetection>, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(VisionError::Inference("session unavailable".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Holds every detect call open until the test releases a permit
pub struct GatedDetector {
    pub gate: Arc<Semaphore>,
    pub started: Arc<Semaphore>,
    pub detections: Vec<RawDetection>,
}

impl GatedDetector {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            started: Arc::new(Semaphore::new(0)),
            detections,
        }
    }
}

#[async_trait]
impl Detector for GatedDetector {
    async fn detect(&self, _color: &ColorSnapshot) -> Result<Vec<RawDetection>, VisionError> {
        self.started.add_permits(1);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| VisionError::Inference(e.to_string()))?;
        permit.forget();
        Ok(self.detections.clone())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

/// Uniform mask with a fixed label
pub struct UniformClassifier {
    pub label: u32,
    pub labels: LabelTable,
    pub calls: AtomicUsize,
}

impl UniformClassifier {
    pub fn new(label: u32, labels: &[&str]) -> Self {
        Self {
            label,
            labels: labels.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Classifier for UniformClassifier {
    async fn classify(&self, _color: &ColorSnapshot) -> Result<SegmentationMask, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SegmentationMask::uniform(16, 16, self.label))
    }

    fn labels(&self) -> LabelTable {
        self.labels.clone()
    }

    fn name(&self) -> &str {
        "uniform"
    }
}
