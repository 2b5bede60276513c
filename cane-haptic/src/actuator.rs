//! Alert actuator collaborator

use serde::{Deserialize, Serialize};
use tracing::info;

/// Pulse intensity accepted by an actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pulse {
    Light,
    Strong,
}

/// Haptic/audio output device. Commands are fire-and-forget; implementations
/// must not block the caller.
pub trait Actuator: Send + Sync {
    /// Emit a single pulse
    fn pulse(&self, intensity: Pulse);

    /// Play the short audible cue that accompanies the closest tier
    fn audible_cue(&self);

    /// Get actuator name
    fn name(&self) -> &str;
}

/// Actuator that only writes commands to the log
#[derive(Debug, Default)]
pub struct LoggingActuator;

impl Actuator for LoggingActuator {
    fn pulse(&self, intensity: Pulse) {
        info!(?intensity, "haptic pulse");
    }

    fn audible_cue(&self) {
        info!("audible cue");
    }

    fn name(&self) -> &str {
        "log"
    }
}
