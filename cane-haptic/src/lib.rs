//! cane-haptic: alert output for the cane perception pipeline
//!
//! Maps the distance of the nearest obstacle onto four alert tiers and drives
//! a fire-and-forget [`Actuator`] (vibration motor, speaker) with throttling
//! and a cancellable repeating pulse for the closest tier.

pub mod actuator;
pub mod config;
pub mod error;
pub mod policy;

pub use actuator::{Actuator, LoggingActuator, Pulse};
pub use config::AlertConfig;
pub use error::AlertError;
pub use policy::{AlertOutcome, AlertPolicy, AlertTier};
