//! One-line status text for the nearest obstacle

use crate::depth::NearestObstacle;
use crate::fusion::DetectionRegion;
use crate::models::{LabelTable, SegmentationMask};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the nearest obstacle's label came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    Detected,
    Classified,
}

impl LabelSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelSource::Detected => "detected",
            LabelSource::Classified => "classified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub label: Option<String>,
    pub source: Option<LabelSource>,
    pub distance: Option<f32>,
}

impl Description {
    pub fn none() -> Self {
        Self {
            label: None,
            source: None,
            distance: None,
        }
    }

    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(distance) = self.distance else {
            return f.write_str("no obstacle");
        };
        match (&self.label, self.source) {
            (Some(label), Some(source)) => write!(f, "{} {} – {:.2} m", source.as_str(), label, distance),
            _ => write!(f, "obstacle – {:.2} m", distance),
        }
    }
}

/// Resolve the nearest obstacle's label: a covering detector region first,
/// then the segmentation mask, then a generic "obstacle".
pub fn compose(
    nearest: Option<&NearestObstacle>,
    regions: &[DetectionRegion],
    mask: Option<&SegmentationMask>,
    labels: &LabelTable,
) -> Description {
    let Some(nearest) = nearest else {
        return Description::none();
    };
    let point = nearest.location;

    let (label, source) = if let Some(region) = regions.iter().find(|r| r.rect.contains(point)) {
        (Some(region.label.clone()), Some(LabelSource::Detected))
    } else if let Some(name) = mask
        .and_then(|m| m.label_at(point))
        .and_then(|idx| labels.name(idx))
    {
        (Some(name.to_string()), Some(LabelSource::Classified))
    } else {
        (None, None)
    };

    Description {
        label,
        source,
        distance: Some(nearest.depth),
    }
}
