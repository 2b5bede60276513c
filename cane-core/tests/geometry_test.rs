//! Property tests for the landscape/portrait transforms

use cane_core::geometry::{NormalizedPoint, NormalizedRect};
use proptest::prelude::*;

fn landscape_rect() -> impl Strategy<Value = NormalizedRect> {
    (0.0f32..1.0, 0.0f32..1.0).prop_flat_map(|(x, y)| {
        (Just(x), Just(y), 0.0f32..=(1.0 - x), 0.0f32..=(1.0 - y))
            .prop_map(|(x, y, w, h)| NormalizedRect::new(x, y, w, h))
    })
}

proptest! {
    #[test]
    fn rect_round_trip(rect in landscape_rect()) {
        let back = rect.landscape_to_portrait().portrait_to_landscape();
        prop_assert!((back.x - rect.x).abs() < 1e-5);
        prop_assert!((back.y - rect.y).abs() < 1e-5);
        prop_assert!((back.width - rect.width).abs() < 1e-5);
        prop_assert!((back.height - rect.height).abs() < 1e-5);
    }

    #[test]
    fn rotated_rect_stays_in_unit_square(rect in landscape_rect()) {
        let portrait = rect.landscape_to_portrait();
        prop_assert!(portrait.min_x() >= -1e-6 && portrait.max_x() <= 1.0 + 1e-6);
        prop_assert!(portrait.min_y() >= -1e-6 && portrait.max_y() <= 1.0 + 1e-6);
    }

    #[test]
    fn point_round_trip(lx in 0.0f32..=1.0, ly in 0.0f32..=1.0) {
        let p = NormalizedPoint::from_landscape(lx, ly);
        prop_assert!(p.is_normalized());
        let (bx, by) = p.to_landscape();
        prop_assert!((bx - lx).abs() < 1e-6);
        prop_assert!((by - ly).abs() < 1e-6);
    }

    #[test]
    fn rotation_preserves_containment(rect in landscape_rect(), lx in 0.0f32..1.0, ly in 0.0f32..1.0) {
        // pick points away from the edges so float rounding cannot flip the answer
        let inside_landscape = lx > rect.min_x() + 1e-4 && lx < rect.max_x() - 1e-4
            && ly > rect.min_y() + 1e-4 && ly < rect.max_y() - 1e-4;
        if inside_landscape {
            let portrait = rect.landscape_to_portrait();
            prop_assert!(portrait.contains(NormalizedPoint::from_landscape(lx, ly)));
        }
    }
}
