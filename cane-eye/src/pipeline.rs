//! Frame pipeline controller
//!
//! `on_frame` runs on the sensor callback thread. It only snapshots the
//! buffers and hands the frame to the tokio worker context; everything else
//! (detection, depth analysis, alerting, description) happens there. One
//! frame at most is in flight: frames arriving while the gate is held are
//! dropped, never queued.

use crate::config::{HeatmapConfig, VisionConfig};
use crate::depth::{nearest_cluster, DepthGrid, NearestObstacle};
use crate::describe;
use crate::error::VisionError;
use crate::frame::{ColorView, DepthView, FrameSnapshot};
use crate::fusion::{FusionEngine, FusionPath};
use crate::heatmap;
use crate::metrics::FrameMetrics;
use crate::state::{PerformanceCounters, PublishedState, StatePublisher, StateSubscriber};
use cane_haptic::AlertPolicy;
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// What happened to a frame handed to [`FramePipeline::on_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    /// Snapshotted and dispatched under this frame id
    Accepted(u64),
    /// Another frame was still in flight
    Dropped,
    /// Snapshot failed; nothing was dispatched
    Failed,
}

struct PipelineInner {
    config: VisionConfig,
    fusion: FusionEngine,
    alerts: Arc<AlertPolicy>,
    publisher: StatePublisher,
    metrics: FrameMetrics,
    in_flight: AtomicBool,
    idle: Notify,
    next_id: AtomicU64,
}

/// Releases the in-flight gate when the frame finishes, on every path
struct InFlightGuard {
    inner: Arc<PipelineInner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.store(false, Ordering::Release);
        self.inner.idle.notify_waiters();
    }
}

pub struct FramePipeline {
    inner: Arc<PipelineInner>,
    runtime: Handle,
}

impl FramePipeline {
    pub fn new(
        config: VisionConfig,
        fusion: FusionEngine,
        alerts: Arc<AlertPolicy>,
        runtime: Handle,
    ) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        info!(
            "Frame pipeline ready (fallback: {}, fps window: {})",
            fusion.has_fallback(),
            config.fps_window
        );
        let metrics = FrameMetrics::new(config.fps_window);
        Ok(Self {
            inner: Arc::new(PipelineInner {
                config,
                fusion,
                alerts,
                publisher: StatePublisher::new(),
                metrics,
                in_flight: AtomicBool::new(false),
                idle: Notify::new(),
                next_id: AtomicU64::new(0),
            }),
            runtime,
        })
    }

    /// Sensor callback. Returns as soon as the buffers are copied.
    pub fn on_frame(&self, color: ColorView<'_>, depth: Option<DepthView<'_>>) -> FrameDecision {
        self.inner.metrics.record_arrival(Instant::now());

        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.inner.metrics.record_dropped();
            debug!("Frame dropped, previous frame still in flight");
            return FrameDecision::Dropped;
        }
        let guard = InFlightGuard {
            inner: Arc::clone(&self.inner),
        };

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let frame = match FrameSnapshot::capture(id, &color, depth.as_ref()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame {} snapshot failed: {}", id, e);
                self.inner.metrics.record_failed();
                return FrameDecision::Failed;
            }
        };
        self.inner.metrics.record_accepted();

        let inner = Arc::clone(&self.inner);
        self.runtime.spawn(async move {
            let _guard = guard;
            inner.process(frame).await;
        });
        FrameDecision::Accepted(id)
    }

    pub fn subscribe(&self) -> StateSubscriber {
        self.inner.publisher.subscribe()
    }

    pub fn current_state(&self) -> Arc<PublishedState> {
        self.inner.publisher.current()
    }

    pub fn counters(&self) -> PerformanceCounters {
        self.inner.metrics.snapshot()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    pub fn alerts(&self) -> &Arc<AlertPolicy> {
        &self.inner.alerts
    }

    pub fn fusion(&self) -> &FusionEngine {
        &self.inner.fusion
    }

    /// Resolves once no frame is in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_busy() {
                return;
            }
            notified.await;
        }
    }
}

impl PipelineInner {
    async fn process(&self, frame: FrameSnapshot) {
        let frame_id = frame.id;
        let captured_at = frame.captured_at;
        let output = match self.fusion.fuse(&frame).await {
            Ok(output) => output,
            Err(e) => {
                error!("Frame {} aborted: {}", frame_id, e);
                self.metrics.record_failed();
                return;
            }
        };
        self.metrics.record_latency(output.inference_latency);

        let band = self.config.cluster_band_m;
        let heat_config = self.config.heatmap.clone();
        let depth = frame.depth;
        let analysis = tokio::task::spawn_blocking(move || analyze_depth(depth, band, &heat_config)).await;
        let (nearest, heat_map) = match analysis {
            Ok(result) => result,
            Err(e) => {
                error!("Frame {} depth analysis failed: {}", frame_id, e);
                self.metrics.record_failed();
                return;
            }
        };

        let alert = match &nearest {
            Some(n) => Some(self.alerts.evaluate(n.depth)),
            None => {
                self.alerts.cancel_repeat();
                None
            }
        };

        let description = describe::compose(
            nearest.as_ref(),
            &output.regions,
            output.mask.as_deref(),
            self.fusion.labels(),
        );
        debug!("Frame {}: {}", frame_id, description);

        self.metrics.record_published();
        self.metrics.record_frame_latency(captured_at.elapsed());
        let state = PublishedState {
            frame_id,
            regions: output.regions,
            nearest,
            heat_map: heat_map.map(Arc::new),
            heat_map_stale: output.path == FusionPath::Fallback,
            path: Some(output.path),
            alert,
            counters: self.metrics.snapshot(),
            ..PublishedState::initial()
        }
        .with_description(&description);
        self.publisher.publish(state);
    }
}

/// Nearest cluster and heat-map for one depth snapshot
fn analyze_depth(
    depth: Option<DepthGrid>,
    band: f32,
    heat_config: &HeatmapConfig,
) -> (Option<NearestObstacle>, Option<RgbaImage>) {
    let Some(grid) = depth else {
        return (None, None);
    };
    let nearest = nearest_cluster(&grid, band);
    let heat_map = match heatmap::render(&grid, heat_config) {
        Ok(img) => Some(img),
        Err(e) => {
            warn!("Heat-map rendering failed: {}", e);
            None
        }
    };
    (nearest, heat_map)
}
