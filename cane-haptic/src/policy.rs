//! Distance-tiered alert policy
//!
//! | distance d (m)  | response                                           |
//! |-----------------|----------------------------------------------------|
//! | d < 0.20        | strong pulse + audible cue, strong pulse every 0.5 s |
//! | 0.20 ≤ d < 0.50 | single strong pulse                                |
//! | 0.50 ≤ d < 1.00 | single light pulse                                 |
//! | d ≥ 1.00        | nothing                                            |
//!
//! Any new alert within the throttle window of the previous one is
//! suppressed. At most one repeat task exists at a time; it is aborted as soon
//! as an evaluation lands outside the repeating tier.

use crate::actuator::{Actuator, Pulse};
use crate::config::AlertConfig;
use crate::error::AlertError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Alert tier for a nearest-obstacle distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertTier {
    None,
    Light,
    Strong,
    Repeating,
}

impl AlertTier {
    /// Classify a distance in meters. Non-finite distances never alert.
    pub fn for_distance(distance: f32, config: &AlertConfig) -> Self {
        if !distance.is_finite() {
            return AlertTier::None;
        }
        if distance < config.repeat_below_m {
            AlertTier::Repeating
        } else if distance < config.strong_below_m {
            AlertTier::Strong
        } else if distance < config.light_below_m {
            AlertTier::Light
        } else {
            AlertTier::None
        }
    }
}

/// Result of one policy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertOutcome {
    /// The tier's alert was sent to the actuator
    Issued(AlertTier),
    /// The tier called for an alert but the throttle window was still open
    Suppressed(AlertTier),
    /// Nothing to do: far obstacle or alerts disabled
    Silent,
}

impl AlertOutcome {
    pub fn tier(&self) -> AlertTier {
        match self {
            AlertOutcome::Issued(tier) | AlertOutcome::Suppressed(tier) => *tier,
            AlertOutcome::Silent => AlertTier::None,
        }
    }
}

/// Spawned repeating pulse. Dropping it aborts the task.
struct RepeatTask {
    handle: JoinHandle<()>,
}

impl Drop for RepeatTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Default)]
struct AlertState {
    last_triggered: Option<Instant>,
    repeat: Option<RepeatTask>,
}

/// Owner of the process-wide alert state
pub struct AlertPolicy {
    config: AlertConfig,
    actuator: Arc<dyn Actuator>,
    state: Mutex<AlertState>,
}

impl AlertPolicy {
    /// Create a new alert policy
    pub fn new(config: AlertConfig, actuator: Arc<dyn Actuator>) -> Result<Self, AlertError> {
        config.validate().map_err(AlertError::Config)?;
        debug!(actuator = actuator.name(), "alert policy ready");
        Ok(Self {
            config,
            actuator,
            state: Mutex::new(AlertState::default()),
        })
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Evaluate a nearest-obstacle distance now
    pub fn evaluate(&self, distance: f32) -> AlertOutcome {
        self.evaluate_at(distance, Instant::now())
    }

    /// Evaluate a nearest-obstacle distance observed at `now`
    pub fn evaluate_at(&self, distance: f32, now: Instant) -> AlertOutcome {
        let mut state = self.state.lock();

        if !self.config.enabled {
            state.repeat = None;
            return AlertOutcome::Silent;
        }

        let tier = AlertTier::for_distance(distance, &self.config);

        // leaving the repeating tier cancels regardless of the throttle
        if tier != AlertTier::Repeating && state.repeat.take().is_some() {
            debug!(distance, ?tier, "repeating alert cancelled");
        }

        if tier == AlertTier::None {
            return AlertOutcome::Silent;
        }

        if let Some(last) = state.last_triggered {
            if now.saturating_duration_since(last) < self.config.throttle() {
                return AlertOutcome::Suppressed(tier);
            }
        }
        state.last_triggered = Some(now);

        match tier {
            AlertTier::Repeating => {
                state.repeat = None;
                self.actuator.pulse(Pulse::Strong);
                self.actuator.audible_cue();
                state.repeat = self.spawn_repeat(now);
            }
            AlertTier::Strong => self.actuator.pulse(Pulse::Strong),
            AlertTier::Light => self.actuator.pulse(Pulse::Light),
            AlertTier::None => {}
        }

        debug!(distance, ?tier, "alert issued");
        AlertOutcome::Issued(tier)
    }

    /// Stop the repeating alert, if any. Returns whether one was active.
    pub fn cancel_repeat(&self) -> bool {
        let cancelled = self.state.lock().repeat.take().is_some();
        if cancelled {
            debug!("repeating alert cleared");
        }
        cancelled
    }

    pub fn has_active_repeat(&self) -> bool {
        self.state.lock().repeat.is_some()
    }

    /// Timestamp of the last issued alert
    pub fn last_triggered(&self) -> Option<Instant> {
        self.state.lock().last_triggered
    }

    fn spawn_repeat(&self, start: Instant) -> Option<RepeatTask> {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("No async runtime for repeating alert: {}", e);
                return None;
            }
        };

        let actuator = self.actuator.clone();
        let period = self.config.repeat_interval();
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(start + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                actuator.pulse(Pulse::Strong);
            }
        });

        Some(RepeatTask { handle })
    }
}
