//! cane-core: shared building blocks for the cane perception stack
//!
//! Holds the workspace-wide error type, the portrait-normalized geometry
//! every published rectangle and point lives in, and config-file loading.

pub mod config;
pub mod error;
pub mod geometry;

pub use error::{Error, Result};
pub use geometry::{NormalizedPoint, NormalizedRect};
