//! Spoken snapshot of the current detections
//!
//! Builds the text only; speech synthesis is left to the host.

use crate::fusion::DetectionRegion;

/// Coarse bearing of a region's centre in portrait space
pub fn direction(region: &DetectionRegion) -> String {
    let cx = region.rect.mid_x();
    let cy = region.rect.mid_y();
    let horizontal = if cx < 0.33 {
        "left"
    } else if cx > 0.66 {
        "right"
    } else {
        "centre"
    };
    if cy > 0.6 {
        format!("front {}", horizontal)
    } else {
        horizontal.to_string()
    }
}

/// "chair left at 1.2 metres, door front centre at 3.0 metres"
///
/// Regions without a distance are skipped; `None` when nothing is left to say.
pub fn snapshot_phrase(regions: &[DetectionRegion]) -> Option<String> {
    let phrases: Vec<String> = regions
        .iter()
        .filter_map(|r| {
            let d = r.distance?;
            Some(format!("{} {} at {:.1} metres", r.label, direction(r), d))
        })
        .collect();
    if phrases.is_empty() {
        None
    } else {
        Some(phrases.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cane_core::NormalizedRect;

    fn region(label: &str, rect: NormalizedRect, distance: Option<f32>) -> DetectionRegion {
        DetectionRegion {
            label: label.to_string(),
            confidence: 0.8,
            rect,
            distance,
        }
    }

    #[test]
    fn test_directions() {
        let left = region("a", NormalizedRect::new(0.0, 0.0, 0.2, 0.2), None);
        let right = region("b", NormalizedRect::new(0.8, 0.0, 0.2, 0.2), None);
        let front = region("c", NormalizedRect::new(0.4, 0.7, 0.2, 0.2), None);
        assert_eq!(direction(&left), "left");
        assert_eq!(direction(&right), "right");
        assert_eq!(direction(&front), "front centre");
    }

    #[test]
    fn test_phrase_joins_regions_with_distance() {
        let regions = [
            region("chair", NormalizedRect::new(0.0, 0.0, 0.2, 0.2), Some(1.24)),
            region("cup", NormalizedRect::new(0.4, 0.4, 0.2, 0.2), None),
            region("door", NormalizedRect::new(0.4, 0.7, 0.2, 0.2), Some(3.0)),
        ];
        assert_eq!(
            snapshot_phrase(&regions).as_deref(),
            Some("chair left at 1.2 metres, door front centre at 3.0 metres")
        );
    }

    #[test]
    fn test_phrase_empty() {
        assert_eq!(snapshot_phrase(&[]), None);
        let regions = [region("cup", NormalizedRect::unit(), None)];
        assert_eq!(snapshot_phrase(&regions), None);
    }
}
