//! Diagnostic throughput and frame counters

use crate::state::PerformanceCounters;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Sliding-window frame-rate estimator over the last `window` arrivals
#[derive(Debug)]
pub struct ThroughputMeter {
    window: usize,
    arrivals: VecDeque<Instant>,
}

impl ThroughputMeter {
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            arrivals: VecDeque::with_capacity(window + 1),
        }
    }

    /// Record an arrival; returns the current rate once the window is full
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        self.arrivals.push_back(now);
        while self.arrivals.len() > self.window {
            self.arrivals.pop_front();
        }
        self.fps()
    }

    pub fn fps(&self) -> Option<f64> {
        if self.arrivals.len() < self.window {
            return None;
        }
        let (first, last) = (self.arrivals.front()?, self.arrivals.back()?);
        let span = last.saturating_duration_since(*first).as_secs_f64();
        if span <= 0.0 {
            return None;
        }
        Some((self.window - 1) as f64 / span)
    }
}

/// Lock-free counters shared between the sensor callback and the worker
#[derive(Debug)]
pub struct FrameMetrics {
    accepted: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    published: AtomicU64,
    throughput: Mutex<ThroughputMeter>,
    last_latency: Mutex<Option<Duration>>,
    last_frame_latency: Mutex<Option<Duration>>,
}

impl FrameMetrics {
    pub fn new(fps_window: usize) -> Self {
        Self {
            accepted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            published: AtomicU64::new(0),
            throughput: Mutex::new(ThroughputMeter::new(fps_window)),
            last_latency: Mutex::new(None),
            last_frame_latency: Mutex::new(None),
        }
    }

    pub fn record_arrival(&self, now: Instant) {
        self.throughput.lock().record(now);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, latency: Duration) {
        *self.last_latency.lock() = Some(latency);
    }

    /// Snapshot capture to publication of a completed frame
    pub fn record_frame_latency(&self, latency: Duration) {
        *self.last_frame_latency.lock() = Some(latency);
    }

    pub fn snapshot(&self) -> PerformanceCounters {
        PerformanceCounters {
            fps: self.throughput.lock().fps(),
            inference_latency_ms: self.last_latency.lock().map(as_millis),
            frame_latency_ms: self.last_frame_latency.lock().map(as_millis),
            frames_accepted: self.accepted.load(Ordering::Relaxed),
            frames_dropped: self.dropped.load(Ordering::Relaxed),
            frames_failed: self.failed.load(Ordering::Relaxed),
            frames_published: self.published.load(Ordering::Relaxed),
        }
    }
}

fn as_millis(d: Duration) -> f64 {
    d.as_micros() as f64 / 1000.0
}
