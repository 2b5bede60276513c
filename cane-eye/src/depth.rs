//! Depth analysis over a single-channel grid of meters
//!
//! All routines are pure functions of the grid: no shared state, so they can
//! run anywhere and replay deterministically on synthetic data. The grid is in
//! the sensor's native landscape orientation; results are reported in
//! portrait-normalized space (see [`cane_core::geometry`]).

use crate::error::VisionError;
use cane_core::geometry::{NormalizedPoint, NormalizedRect};
use serde::{Deserialize, Serialize};

/// Row-major landscape depth grid. `0` or non-finite samples mean "no reading".
#[derive(Debug, Clone, PartialEq)]
pub struct DepthGrid {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

/// Nearest-surface estimate for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestObstacle {
    /// Median depth of the nearest cluster (m)
    pub depth: f32,
    /// Cluster centroid in portrait-normalized space
    pub location: NormalizedPoint,
    /// Samples in the cluster
    pub samples: usize,
}

/// A sample counts as a reading when it is finite and strictly positive
#[inline]
pub fn is_valid_depth(z: f32) -> bool {
    z.is_finite() && z > 0.0
}

impl DepthGrid {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self, VisionError> {
        let expected = width
            .checked_mul(height)
            .ok_or_else(|| VisionError::Processing("Depth grid size overflow".to_string()))?;
        if data.len() != expected {
            return Err(VisionError::Processing(format!(
                "Depth grid has {} samples, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Grid with every sample set to `value`
    pub fn filled(width: usize, height: usize, value: f32) -> Result<Self, VisionError> {
        let len = width
            .checked_mul(height)
            .ok_or_else(|| VisionError::Processing("Depth grid size overflow".to_string()))?;
        Ok(Self {
            width,
            height,
            data: vec![value; len],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    /// Set a rectangular patch of samples, clipped to the grid
    pub fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, value: f32) {
        let x1 = x.saturating_add(width).min(self.width);
        let y1 = y.saturating_add(height).min(self.height);
        for row in y.min(y1)..y1 {
            let start = row * self.width;
            self.data[start + x.min(x1)..start + x1].fill(value);
        }
    }
}

/// Mean of the `top_n` smallest valid samples inside a portrait-normalized
/// rectangle, or `None` when the rectangle holds no valid sample.
///
/// Averaging only the nearest samples biases the estimate toward the closest
/// surface in the region instead of the background behind it.
pub fn region_estimate(grid: &DepthGrid, rect: &NormalizedRect, top_n: usize) -> Option<f32> {
    if top_n == 0 || !rect.is_finite() {
        return None;
    }

    let (w, h) = (grid.width as f32, grid.height as f32);
    // portrait rect -> landscape window
    let x0 = to_index(rect.min_y() * w, grid.width);
    let x1 = to_index(rect.max_y() * w, grid.width);
    let y0 = to_index((1.0 - rect.max_x()) * h, grid.height);
    let y1 = to_index((1.0 - rect.min_x()) * h, grid.height);

    let mut values: Vec<f32> = (y0..y1)
        .flat_map(|y| grid.data[y * grid.width + x0..y * grid.width + x1.max(x0)].iter().copied())
        .filter(|z| is_valid_depth(*z))
        .collect();
    if values.is_empty() {
        return None;
    }

    values.sort_unstable_by(f32::total_cmp);
    let k = top_n.min(values.len());
    let sum: f64 = values[..k].iter().map(|z| *z as f64).sum();
    Some((sum / k as f64) as f32)
}

/// Cluster every sample within `band_m` of the global minimum depth and report
/// its median depth and portrait-normalized centroid.
pub fn nearest_cluster(grid: &DepthGrid, band_m: f32) -> Option<NearestObstacle> {
    let min_z = grid
        .data
        .iter()
        .copied()
        .filter(|z| is_valid_depth(*z))
        .min_by(f32::total_cmp)?;
    let threshold = min_z + band_m;

    let mut depths = Vec::new();
    let (mut sum_x, mut sum_y) = (0f64, 0f64);
    for (i, z) in grid.data.iter().copied().enumerate() {
        if is_valid_depth(z) && z <= threshold {
            depths.push(z);
            sum_x += (i % grid.width) as f64;
            sum_y += (i / grid.width) as f64;
        }
    }

    let count = depths.len();
    if count == 0 {
        return None;
    }
    depths.sort_unstable_by(f32::total_cmp);
    let median = depths[count / 2];

    let cx = sum_x / count as f64;
    let cy = sum_y / count as f64;
    let location = NormalizedPoint::from_landscape(
        (cx / grid.width as f64) as f32,
        (cy / grid.height as f64) as f32,
    );

    Some(NearestObstacle {
        depth: median,
        location,
        samples: count,
    })
}

fn to_index(v: f32, len: usize) -> usize {
    if v.is_nan() || v <= 0.0 {
        return 0;
    }
    (v as usize).min(len)
}
