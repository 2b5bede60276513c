//! Portrait-normalized display geometry
//!
//! Every rectangle and point the pipeline publishes lives in a `[0,1]×[0,1]`
//! portrait space with the origin at the top-left. Sensors and models work in
//! their native landscape frame; the device holds the sensor rotated by 90°,
//! so conversion is
//!
//! ```text
//! portrait_x = 1 − landscape_y
//! portrait_y = landscape_x
//! ```
//!
//! and the inverse is `landscape_x = portrait_y`, `landscape_y = 1 − portrait_x`.

use serde::{Deserialize, Serialize};

/// Point in normalized `[0,1]` coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Map a point given as landscape fractions into portrait space
    pub fn from_landscape(landscape_x: f32, landscape_y: f32) -> Self {
        Self {
            x: 1.0 - landscape_y,
            y: landscape_x,
        }
    }

    /// Landscape fractions `(x, y)` of this portrait point
    pub fn to_landscape(&self) -> (f32, f32) {
        (self.y, 1.0 - self.x)
    }

    pub fn is_normalized(&self) -> bool {
        in_unit(self.x) && in_unit(self.y)
    }
}

/// Axis-aligned rectangle in normalized coordinates, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanning the full unit square
    pub fn unit() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn min_x(&self) -> f32 {
        self.x
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn min_y(&self) -> f32 {
        self.y
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Half-open containment: left/top edges are inside, right/bottom are
    /// not, except where they lie on the unit square's own far edge.
    pub fn contains(&self, point: NormalizedPoint) -> bool {
        point.x >= self.min_x()
            && below_edge(point.x, self.max_x())
            && point.y >= self.min_y()
            && below_edge(point.y, self.max_y())
    }

    /// Intersect with the unit square. Returns `None` for non-finite or empty results.
    pub fn clamped(&self) -> Option<Self> {
        if !self.is_finite() {
            return None;
        }
        let x0 = self.min_x().min(self.max_x()).clamp(0.0, 1.0);
        let x1 = self.min_x().max(self.max_x()).clamp(0.0, 1.0);
        let y0 = self.min_y().min(self.max_y()).clamp(0.0, 1.0);
        let y1 = self.min_y().max(self.max_y()).clamp(0.0, 1.0);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Rotate a landscape rectangle into portrait space (sensor 90° clockwise).
    pub fn landscape_to_portrait(&self) -> Self {
        Self {
            x: 1.0 - (self.y + self.height),
            y: self.x,
            width: self.height,
            height: self.width,
        }
    }

    /// Inverse of [`NormalizedRect::landscape_to_portrait`].
    pub fn portrait_to_landscape(&self) -> Self {
        Self {
            x: self.y,
            y: 1.0 - (self.x + self.width),
            width: self.height,
            height: self.width,
        }
    }

    /// Intersection over union, 0.0 for disjoint or degenerate rectangles
    pub fn iou(&self, other: &Self) -> f32 {
        if !self.is_finite() || !other.is_finite() {
            return 0.0;
        }
        let inter_w = self.max_x().min(other.max_x()) - self.min_x().max(other.min_x());
        let inter_h = self.max_y().min(other.max_y()) - self.min_y().max(other.min_y());
        if inter_w <= 0.0 || inter_h <= 0.0 {
            return 0.0;
        }
        let inter = inter_w * inter_h;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        (inter / union).clamp(0.0, 1.0)
    }

    pub fn is_normalized(&self) -> bool {
        self.is_finite()
            && in_unit(self.min_x())
            && in_unit(self.max_x())
            && in_unit(self.min_y())
            && in_unit(self.max_y())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

fn below_edge(v: f32, edge: f32) -> bool {
    v < edge || (edge >= 1.0 && v <= edge)
}

fn in_unit(v: f32) -> bool {
    (0.0..=1.0).contains(&v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_rotation() {
        // landscape top-left corner lands on the portrait top-right
        let p = NormalizedPoint::from_landscape(0.0, 0.0);
        assert_eq!(p, NormalizedPoint::new(1.0, 0.0));

        let p = NormalizedPoint::from_landscape(0.25, 0.75);
        assert!((p.x - 0.25).abs() < 1e-6);
        assert!((p.y - 0.25).abs() < 1e-6);
        let (lx, ly) = p.to_landscape();
        assert!((lx - 0.25).abs() < 1e-6);
        assert!((ly - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_rect_rotation_swaps_extent() {
        let landscape = NormalizedRect::new(0.1, 0.2, 0.3, 0.4);
        let portrait = landscape.landscape_to_portrait();
        assert!((portrait.x - 0.4).abs() < 1e-6);
        assert!((portrait.y - 0.1).abs() < 1e-6);
        assert!((portrait.width - 0.4).abs() < 1e-6);
        assert!((portrait.height - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_contains_half_open() {
        let r = NormalizedRect::new(0.25, 0.25, 0.5, 0.5);
        assert!(r.contains(NormalizedPoint::new(0.25, 0.25)));
        assert!(r.contains(NormalizedPoint::new(0.5, 0.5)));
        assert!(!r.contains(NormalizedPoint::new(0.75, 0.5)));
        assert!(!r.contains(NormalizedPoint::new(0.1, 0.5)));
    }

    #[test]
    fn test_contains_unit_square_far_edge() {
        // landscape row 0 maps to portrait x = 1.0
        let corner = NormalizedPoint::from_landscape(0.5, 0.0);
        assert_eq!(corner.x, 1.0);
        assert!(NormalizedRect::unit().contains(corner));
        assert!(NormalizedRect::unit().contains(NormalizedPoint::new(1.0, 1.0)));

        let right_half = NormalizedRect::new(0.5, 0.0, 0.5, 1.0);
        assert!(right_half.contains(corner));
        let left_half = NormalizedRect::new(0.0, 0.0, 0.5, 1.0);
        assert!(!left_half.contains(NormalizedPoint::new(0.5, 0.5)));
    }

    #[test]
    fn test_clamped() {
        let r = NormalizedRect::new(-0.2, 0.5, 0.5, 0.8).clamped().unwrap();
        assert_eq!(r.min_x(), 0.0);
        assert!((r.max_x() - 0.3).abs() < 1e-6);
        assert_eq!(r.max_y(), 1.0);
        assert!(r.is_normalized());

        assert!(NormalizedRect::new(1.5, 0.0, 0.2, 0.2).clamped().is_none());
        assert!(NormalizedRect::new(f32::NAN, 0.0, 0.2, 0.2).clamped().is_none());
    }

    #[test]
    fn test_iou() {
        let a = NormalizedRect::new(0.0, 0.0, 0.5, 0.5);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        let b = NormalizedRect::new(0.5, 0.5, 0.5, 0.5);
        assert_eq!(a.iou(&b), 0.0);
        let c = NormalizedRect::new(0.25, 0.0, 0.5, 0.5);
        let iou = a.iou(&c);
        assert!((iou - 1.0 / 3.0).abs() < 1e-5);
    }
}
