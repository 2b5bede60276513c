//! Error types for cane-haptic

use cane_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Actuator error: {0}")]
    Actuator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl From<AlertError> for CoreError {
    fn from(err: AlertError) -> Self {
        CoreError::Actuator(format!("Alert error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_error_to_core_error() {
        let core: CoreError = AlertError::Config("bad tiers".to_string()).into();
        match core {
            CoreError::Actuator(msg) => {
                assert!(msg.contains("Alert error"));
                assert!(msg.contains("bad tiers"));
            }
            _ => panic!("Expected Actuator error"),
        }
    }
}
