//! Published state hand-off
//!
//! The pipeline is the only writer. Every completed frame replaces the whole
//! [`PublishedState`] in one step, so readers never see a partially updated
//! frame.

use crate::depth::NearestObstacle;
use crate::describe::{Description, LabelSource};
use crate::error::VisionError;
use crate::fusion::{DetectionRegion, FusionPath};
use cane_haptic::AlertOutcome;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Diagnostic counters, published alongside each frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceCounters {
    pub fps: Option<f64>,
    /// Detector dispatch to completion
    pub inference_latency_ms: Option<f64>,
    /// Buffer snapshot to publication
    pub frame_latency_ms: Option<f64>,
    pub frames_accepted: u64,
    pub frames_dropped: u64,
    pub frames_failed: u64,
    pub frames_published: u64,
}

/// Everything the display layer may read about the latest completed frame
#[derive(Debug, Clone, Serialize)]
pub struct PublishedState {
    /// 0 before the first frame completes
    pub frame_id: u64,
    pub regions: Vec<DetectionRegion>,
    pub nearest: Option<NearestObstacle>,
    #[serde(skip)]
    pub heat_map: Option<Arc<RgbaImage>>,
    /// Set when the frame went through the fallback classifier, so the
    /// heat-map reflects depth from before that (slower) stage
    pub heat_map_stale: bool,
    pub description: String,
    pub label: Option<String>,
    pub label_source: Option<LabelSource>,
    pub path: Option<FusionPath>,
    pub alert: Option<AlertOutcome>,
    pub counters: PerformanceCounters,
}

impl PublishedState {
    pub fn initial() -> Self {
        Self {
            frame_id: 0,
            regions: Vec::new(),
            nearest: None,
            heat_map: None,
            heat_map_stale: false,
            description: Description::none().text(),
            label: None,
            label_source: None,
            path: None,
            alert: None,
            counters: PerformanceCounters::default(),
        }
    }

    pub fn with_description(mut self, description: &Description) -> Self {
        self.description = description.text();
        self.label = description.label.clone();
        self.label_source = description.source;
        self
    }
}

impl Default for PublishedState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Single writer side
pub(crate) struct StatePublisher {
    tx: watch::Sender<Arc<PublishedState>>,
}

impl StatePublisher {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(PublishedState::initial()));
        Self { tx }
    }

    pub(crate) fn publish(&self, state: PublishedState) {
        self.tx.send_replace(Arc::new(state));
    }

    pub(crate) fn current(&self) -> Arc<PublishedState> {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> StateSubscriber {
        StateSubscriber { rx: self.tx.subscribe() }
    }
}

/// Read side handed to the display layer
#[derive(Clone)]
pub struct StateSubscriber {
    rx: watch::Receiver<Arc<PublishedState>>,
}

impl StateSubscriber {
    /// Latest state, without waiting
    pub fn current(&self) -> Arc<PublishedState> {
        self.rx.borrow().clone()
    }

    /// Wait for the next published frame
    pub async fn changed(&mut self) -> Result<Arc<PublishedState>, VisionError> {
        self.rx
            .changed()
            .await
            .map_err(|_| VisionError::Processing("Pipeline dropped".to_string()))?;
        Ok(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = PublishedState::initial();
        assert_eq!(state.frame_id, 0);
        assert_eq!(state.description, "no obstacle");
        assert!(state.nearest.is_none());
    }

    #[tokio::test]
    async fn test_subscriber_sees_whole_replacements() {
        let publisher = StatePublisher::new();
        let mut sub = publisher.subscribe();
        assert_eq!(sub.current().frame_id, 0);

        let mut next = PublishedState::initial();
        next.frame_id = 7;
        next.description = "obstacle – 1.00 m".to_string();
        publisher.publish(next);

        let seen = sub.changed().await.unwrap();
        assert_eq!(seen.frame_id, 7);
        assert_eq!(seen.description, "obstacle – 1.00 m");
        assert_eq!(publisher.current().frame_id, 7);
    }

    #[tokio::test]
    async fn test_subscriber_errors_when_publisher_dropped() {
        let publisher = StatePublisher::new();
        let mut sub = publisher.subscribe();
        drop(publisher);
        assert!(sub.changed().await.is_err());
    }

    #[test]
    fn test_state_serializes_without_image() {
        let json = serde_json::to_value(PublishedState::initial()).unwrap();
        assert!(json.get("heat_map").is_none());
        assert_eq!(json["description"], "no obstacle");
    }
}
