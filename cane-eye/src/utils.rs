//! Tensor preparation for the ONNX backends

use crate::error::VisionError;
use crate::frame::ColorSnapshot;
use image::imageops::{self, FilterType};

/// Largest tensor the backends will allocate
const MAX_TENSOR_ELEMENTS: usize = 100_000_000;

/// Resize a color snapshot to `size`×`size` and pack it as a `[3, H, W]`
/// float tensor, scaled to [0, 1] and then normalized per channel.
pub fn snapshot_to_chw_tensor(
    color: &ColorSnapshot,
    size: u32,
    mean: [f32; 3],
    std: [f32; 3],
) -> Result<Vec<f32>, VisionError> {
    if size == 0 {
        return Err(VisionError::Processing("Target dimensions cannot be zero".to_string()));
    }
    let plane = (size as usize)
        .checked_mul(size as usize)
        .ok_or_else(|| VisionError::Processing("Target dimensions too large, would overflow".to_string()))?;
    let total = plane
        .checked_mul(3)
        .filter(|t| *t <= MAX_TENSOR_ELEMENTS)
        .ok_or_else(|| VisionError::Processing("Input tensor too large (max 100M elements)".to_string()))?;

    let rgb = color.to_rgb_image()?;
    let resized = imageops::resize(&rgb, size, size, FilterType::Triangle);

    let mut tensor = vec![0.0f32; total];
    for (i, px) in resized.pixels().enumerate() {
        for c in 0..3 {
            tensor[c * plane + i] = (px.0[c] as f32 / 255.0 - mean[c]) / std[c];
        }
    }
    Ok(tensor)
}

/// Index of the largest value
pub fn argmax(values: impl Iterator<Item = f32>) -> Option<(usize, f32)> {
    values
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .max_by(|a, b| a.1.total_cmp(&b.1))
}
