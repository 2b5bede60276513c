//! Top-level configuration file for the `cane` binary

use anyhow::{anyhow, Context};
use cane_eye::VisionConfig;
use cane_haptic::AlertConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaneConfig {
    pub vision: VisionConfig,
    pub alerts: AlertConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl CaneConfig {
    /// Load from a TOML, YAML or JSON file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config: CaneConfig = match path {
            Some(path) => cane_core::config::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => CaneConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.vision.validate().map_err(|e| anyhow!("Invalid vision config: {}", e))?;
        self.alerts.validate().map_err(|e| anyhow!("Invalid alert config: {}", e))?;
        Ok(())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        cane_core::config::to_toml(self).context("Failed to render config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let text = CaneConfig::default().to_toml().unwrap();
        let parsed: CaneConfig = cane_core::config::parse(&text, cane_core::config::ConfigFormat::Toml).unwrap();
        assert_eq!(parsed.vision.region_top_n, 20);
        assert_eq!(parsed.alerts.throttle_ms, 500);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "vision:\n  confidence_threshold: 0.7\nlogging:\n  json: true").unwrap();
        let config = CaneConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.vision.confidence_threshold, 0.7);
        assert_eq!(config.vision.fps_window, 30);
        assert!(config.logging.json);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"alerts": {{"repeat_below_m": 2.0}}}}"#).unwrap();
        assert!(CaneConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(CaneConfig::load(Some(Path::new("/nonexistent/cane.toml"))).is_err());
    }
}
