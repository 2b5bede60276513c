//! Depth heat-map rendering
//!
//! Every sample maps independently to one RGBA pixel: near is red, far (or no
//! reading) is blue, with a constant alpha so the display layer can overlay
//! the image on the camera feed.

use crate::config::HeatmapConfig;
use crate::depth::{is_valid_depth, DepthGrid};
use crate::error::VisionError;
use image::RgbaImage;
use rayon::prelude::*;

/// Nearness in `[0, 1]`: 1 at the sensor, 0 at `max_depth` or beyond.
/// Missing readings count as far.
pub fn nearness(depth: f32, max_depth: f32) -> f32 {
    let effective = if is_valid_depth(depth) { depth } else { max_depth };
    ((max_depth - effective) / max_depth).clamp(0.0, 1.0)
}

/// Five-stop ramp blue → cyan → green → yellow → red
pub fn heat_color(n: f32) -> [u8; 3] {
    let x = if n.is_nan() { 0.0 } else { n.clamp(0.0, 1.0) };
    let ramp = |t: f32| (255.0 * t) as u8;
    if x < 0.25 {
        let t = x / 0.25;
        [0, ramp(t), 255]
    } else if x < 0.5 {
        let t = (x - 0.25) / 0.25;
        [0, 255, ramp(1.0 - t)]
    } else if x < 0.75 {
        let t = (x - 0.5) / 0.25;
        [ramp(t), 255, 0]
    } else {
        let t = (x - 0.75) / 0.25;
        [255, ramp(1.0 - t), 0]
    }
}

/// Render a grid pixel-for-pixel into an RGBA image of the same size
pub fn render(grid: &DepthGrid, config: &HeatmapConfig) -> Result<RgbaImage, VisionError> {
    let width = u32::try_from(grid.width())
        .map_err(|_| VisionError::Processing("Depth grid too wide for heat-map".to_string()))?;
    let height = u32::try_from(grid.height())
        .map_err(|_| VisionError::Processing("Depth grid too tall for heat-map".to_string()))?;

    let mut rgba = vec![0u8; grid.as_slice().len() * 4];
    rgba.par_chunks_mut(4)
        .zip(grid.as_slice().par_iter())
        .for_each(|(px, depth)| {
            let [r, g, b] = heat_color(nearness(*depth, config.max_depth_m));
            px.copy_from_slice(&[r, g, b, config.alpha]);
        });

    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| VisionError::Processing("Heat-map buffer does not match grid size".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearness_range() {
        assert_eq!(nearness(0.0, 4.0), 0.0);
        assert_eq!(nearness(f32::NAN, 4.0), 0.0);
        assert_eq!(nearness(f32::INFINITY, 4.0), 0.0);
        assert_eq!(nearness(8.0, 4.0), 0.0);
        assert_eq!(nearness(2.0, 4.0), 0.5);
        assert!((nearness(0.001, 4.0) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_heat_color_stops() {
        assert_eq!(heat_color(0.0), [0, 0, 255]);
        assert_eq!(heat_color(0.25), [0, 255, 255]);
        assert_eq!(heat_color(0.5), [0, 255, 0]);
        assert_eq!(heat_color(0.75), [255, 255, 0]);
        assert_eq!(heat_color(1.0), [255, 0, 0]);
    }

    #[test]
    fn test_render_pixel_for_pixel() {
        let grid = DepthGrid::new(2, 1, vec![0.0, 0.001]).unwrap();
        let img = render(&grid, &HeatmapConfig::default()).unwrap();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 180]);
        let near = img.get_pixel(1, 0).0;
        assert_eq!(near[0], 255);
        assert_eq!(near[2], 0);
        assert_eq!(near[3], 180);
    }

    #[test]
    fn test_render_custom_alpha() {
        let grid = DepthGrid::filled(3, 3, 1.0).unwrap();
        let config = HeatmapConfig { max_depth_m: 4.0, alpha: 77 };
        let img = render(&grid, &config).unwrap();
        assert!(img.pixels().all(|p| p.0[3] == 77));
    }
}
