//! Configuration for the alert policy

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Alert tier boundaries and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Master switch for haptic and audio output
    pub enabled: bool,
    /// Below this distance (m) alerts repeat until the obstacle recedes
    pub repeat_below_m: f32,
    /// Below this distance (m) a single strong pulse is issued
    pub strong_below_m: f32,
    /// Below this distance (m) a single light pulse is issued
    pub light_below_m: f32,
    /// Minimum spacing between two issued alerts
    pub throttle_ms: u64,
    /// Period of the repeating strong pulse
    pub repeat_interval_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repeat_below_m: 0.20,
            strong_below_m: 0.50,
            light_below_m: 1.00,
            throttle_ms: 500,
            repeat_interval_ms: 500,
        }
    }
}

impl AlertConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let bounds = [self.repeat_below_m, self.strong_below_m, self.light_below_m];
        if bounds.iter().any(|b| !b.is_finite() || *b <= 0.0) {
            return Err("Alert distances must be finite and positive".to_string());
        }
        if !(self.repeat_below_m < self.strong_below_m && self.strong_below_m < self.light_below_m) {
            return Err("Alert distances must be strictly increasing".to_string());
        }
        if self.throttle_ms == 0 {
            return Err("Throttle interval must be non-zero".to_string());
        }
        if self.repeat_interval_ms == 0 {
            return Err("Repeat interval must be non-zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AlertConfig::default();
        assert!(config.enabled);
        assert_eq!(config.throttle(), Duration::from_millis(500));
        assert_eq!(config.repeat_interval(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_unordered_tiers() {
        let mut config = AlertConfig::default();
        config.strong_below_m = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_non_finite() {
        let mut config = AlertConfig::default();
        config.light_below_m = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_zero_intervals() {
        let mut config = AlertConfig::default();
        config.throttle_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AlertConfig::default();
        config.repeat_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
