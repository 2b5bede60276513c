//! cane-eye: perception pipeline for an assistive navigation cane
//!
//! Each camera/depth frame is snapshotted, run through a fast object
//! detector (falling back to a dense semantic classifier when nothing is
//! found), fused with the depth grid, and turned into labeled distance
//! regions, a nearest-obstacle estimate, a depth heat-map, a one-line
//! description and a haptic alert.

pub mod config;
pub mod depth;
pub mod describe;
pub mod error;
pub mod frame;
pub mod fusion;
pub mod heatmap;
pub mod metrics;
pub mod models;
pub mod narration;
pub mod pipeline;
pub mod state;
#[cfg(feature = "onnx")]
mod utils;

pub use config::{FusionConfig, HeatmapConfig, ModelConfig, VisionConfig};
pub use depth::{DepthGrid, NearestObstacle};
pub use error::VisionError;
pub use frame::{ColorSnapshot, ColorView, DepthView, FrameSnapshot, PixelFormat};
pub use fusion::{DetectionRegion, FusionEngine, FusionOutput, FusionPath};
pub use pipeline::{FrameDecision, FramePipeline};
pub use state::{PerformanceCounters, PublishedState, StateSubscriber};
