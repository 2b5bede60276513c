//! Replay a scenario through the real pipeline

use crate::config::CaneConfig;
use crate::scenario::{Scenario, ScriptedClassifier, ScriptedDetector};
use anyhow::{anyhow, Context};
use cane_eye::models::Classifier;
use cane_eye::narration::snapshot_phrase;
use cane_eye::{ColorView, DepthView, FrameDecision, FramePipeline, FusionConfig, FusionEngine, PixelFormat, PublishedState, VisionError};
use cane_haptic::{AlertPolicy, LoggingActuator};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Sensor-side tally of frame decisions
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SensorSummary {
    pub delivered: usize,
    pub accepted: usize,
    pub dropped: usize,
    pub failed: usize,
}

pub fn build_pipeline(config: &CaneConfig, scenario: Arc<Scenario>) -> anyhow::Result<FramePipeline> {
    let fusion_config = Arc::new(FusionConfig::new(&config.vision, scenario.label_table()));
    let detector = Arc::new(ScriptedDetector::new(scenario.clone()));
    let fallback: Result<Arc<dyn Classifier>, VisionError> = if config.vision.enable_fallback {
        Ok(Arc::new(ScriptedClassifier::new(scenario)))
    } else {
        Err(VisionError::Config("Fallback classifier disabled".to_string()))
    };
    let fusion = FusionEngine::new(fusion_config, detector)
        .context("Invalid fusion configuration")?
        .with_fallback(fallback);

    let alerts = AlertPolicy::new(config.alerts.clone(), Arc::new(LoggingActuator::default()))
        .context("Failed to create alert policy")?;
    FramePipeline::new(config.vision.clone(), fusion, Arc::new(alerts), Handle::current())
        .context("Failed to create frame pipeline")
}

/// Deliver every scheduled frame at `fps`, the way a sensor callback would
pub fn run_sensor(pipeline: &FramePipeline, scenario: &Scenario, fps: f64) -> anyhow::Result<SensorSummary> {
    let period = Duration::from_secs_f64(1.0 / fps);
    let mut summary = SensorSummary::default();
    let start = Instant::now();

    for (n, index) in scenario.schedule().into_iter().enumerate() {
        let deadline = start + period.mul_f64(n as f64);
        if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }

        let color = scenario.color_buffer(index);
        let depth = scenario.depth_grid(index)?;
        let color_view = ColorView::packed(scenario.color_width, scenario.color_height, PixelFormat::Gray8, &color);
        let depth_view = depth
            .as_ref()
            .map(|g| DepthView::packed(g.width(), g.height(), g.as_slice()));

        summary.delivered += 1;
        match pipeline.on_frame(color_view, depth_view) {
            FrameDecision::Accepted(id) => {
                debug!("Scenario frame {} accepted as {}", index, id);
                summary.accepted += 1;
            }
            FrameDecision::Dropped => summary.dropped += 1,
            FrameDecision::Failed => summary.failed += 1,
        }
    }
    Ok(summary)
}

fn state_line(state: &PublishedState) -> anyhow::Result<String> {
    let mut value = serde_json::to_value(state)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("narration".to_string(), serde_json::json!(snapshot_phrase(&state.regions)));
    }
    Ok(serde_json::to_string(&value)?)
}

pub async fn simulate(
    config: &CaneConfig,
    scenario: Scenario,
    fps: f64,
    out: &mut impl Write,
) -> anyhow::Result<SensorSummary> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(anyhow!("Frame rate must be positive"));
    }
    let scenario = Arc::new(scenario);
    let pipeline = Arc::new(build_pipeline(config, scenario.clone())?);
    let mut subscriber = pipeline.subscribe();
    info!("Replaying scenario '{}' at {} fps", scenario.name, fps);

    let (done_tx, mut done_rx) = oneshot::channel();
    {
        let pipeline = pipeline.clone();
        let scenario = scenario.clone();
        std::thread::Builder::new()
            .name("cane-sensor".to_string())
            .spawn(move || {
                let _ = done_tx.send(run_sensor(&pipeline, &scenario, fps));
            })
            .context("Failed to start sensor thread")?;
    }

    let mut last_printed = 0;
    let summary = loop {
        tokio::select! {
            changed = subscriber.changed() => {
                let state = changed?;
                writeln!(out, "{}", state_line(&state)?)?;
                last_printed = state.frame_id;
            }
            result = &mut done_rx => {
                break result.context("Sensor thread stopped unexpectedly")??;
            }
        }
    };

    pipeline.wait_idle().await;
    let state = pipeline.current_state();
    if state.frame_id != last_printed {
        writeln!(out, "{}", state_line(&state)?)?;
    }

    let counters = pipeline.counters();
    info!(
        "Scenario done: {} delivered, {} accepted, {} dropped, {} failed, {} published",
        summary.delivered, summary.accepted, summary.dropped, summary.failed, counters.frames_published
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Scenario {
        let scenario: Scenario = cane_core::config::parse(text, cane_core::config::ConfigFormat::Toml).unwrap();
        scenario.validate().unwrap();
        scenario
    }

    fn lines(out: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_single_frame_classified_close_obstacle() {
        let scenario = parse(
            r#"
width = 20
height = 20
labels = ["floor", "wall"]

[[frames]]
background = 3.0
classified = 1
patches = [{ x = 8, y = 8, width = 5, height = 5, depth = 0.1 }]
"#,
        );
        let mut out = Vec::new();
        let summary = simulate(&CaneConfig::default(), scenario, 100.0, &mut out).await.unwrap();
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.accepted, 1);

        let states = lines(&out);
        let last = states.last().unwrap();
        assert_eq!(last["frame_id"], 1);
        assert_eq!(last["description"], "classified wall – 0.10 m");
        assert_eq!(last["heat_map_stale"], true);
        assert!(last["narration"].is_null());
    }

    #[tokio::test]
    async fn test_every_frame_is_accounted_for() {
        let scenario = parse(
            r#"
width = 10
height = 10
detector_delay_ms = 20

[[frames]]
background = 1.5
repeat = 6

[[frames.detections]]
label = "chair"
confidence = 0.9
rect = { x = 0.0, y = 0.0, width = 1.0, height = 1.0 }
"#,
        );
        let mut out = Vec::new();
        let summary = simulate(&CaneConfig::default(), scenario, 200.0, &mut out).await.unwrap();
        assert_eq!(summary.delivered, 6);
        assert_eq!(summary.accepted + summary.dropped + summary.failed, 6);
        assert!(summary.accepted >= 1);

        let last = lines(&out).pop().unwrap();
        assert_eq!(last["description"], "detected chair – 1.50 m");
        assert_eq!(last["narration"], "chair centre at 1.5 metres");
    }

    #[tokio::test]
    async fn test_rejects_bad_fps() {
        let scenario = parse("width = 2\nheight = 2\n[[frames]]\nbackground = 1.0\n");
        let mut out = Vec::new();
        assert!(simulate(&CaneConfig::default(), scenario, 0.0, &mut out).await.is_err());
    }
}
