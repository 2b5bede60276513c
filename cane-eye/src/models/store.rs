//! Model file resolution and integrity checks

use crate::config::ModelConfig;
use crate::error::VisionError;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Minimum plausible model file size in bytes
const MIN_MODEL_SIZE: u64 = 1024;

/// Outcome of checking a single model file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    /// Present and (when a checksum is configured) verified
    Ready { path: PathBuf, sha256: String },
    Missing { path: PathBuf },
    ChecksumMismatch { path: PathBuf, expected: String, actual: String },
}

impl ModelStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStatus::Ready { .. })
    }
}

/// Resolves and verifies model files under the configured directory
pub struct ModelStore {
    root: PathBuf,
    config: ModelConfig,
}

impl ModelStore {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            root: config.model_path.clone(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for a model file name, rejecting anything that escapes the model directory
    pub fn resolve(&self, name: &str) -> Result<PathBuf, VisionError> {
        if name.is_empty() || name.len() > 255 {
            return Err(VisionError::Model("Invalid model name".to_string()));
        }
        if name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(VisionError::Model(format!(
                "Model name contains invalid characters: {}",
                name
            )));
        }
        let path = self.root.join(name);
        if !path.starts_with(&self.root) {
            return Err(VisionError::Model("Path traversal detected".to_string()));
        }
        Ok(path)
    }

    pub fn detector_path(&self) -> Result<PathBuf, VisionError> {
        self.resolve(&self.config.detector_file)
    }

    pub fn classifier_path(&self) -> Result<PathBuf, VisionError> {
        self.resolve(&self.config.classifier_file)
    }

    /// Check one model file against an optional hex SHA-256
    pub fn check(&self, name: &str, expected_sha256: &str) -> Result<ModelStatus, VisionError> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            debug!("Model file {:?} not found", path);
            return Ok(ModelStatus::Missing { path });
        }

        let size = fs::metadata(&path)?.len();
        if size < MIN_MODEL_SIZE {
            return Err(VisionError::Model(format!(
                "Model file {:?} too small ({} bytes), likely corrupted",
                path, size
            )));
        }

        let actual = sha256_file(&path)?;
        let expected = expected_sha256.trim().to_ascii_lowercase();
        if !expected.is_empty() && expected != actual {
            warn!("Checksum mismatch for {:?}", path);
            return Ok(ModelStatus::ChecksumMismatch { path, expected, actual });
        }

        info!("Model {:?} ready", path);
        Ok(ModelStatus::Ready { path, sha256: actual })
    }

    pub fn check_detector(&self) -> Result<ModelStatus, VisionError> {
        self.check(&self.config.detector_file, &self.config.detector_sha256)
    }

    pub fn check_classifier(&self) -> Result<ModelStatus, VisionError> {
        self.check(&self.config.classifier_file, &self.config.classifier_sha256)
    }

    /// Path of a model that must be usable right now
    pub fn require(&self, name: &str, expected_sha256: &str) -> Result<PathBuf, VisionError> {
        match self.check(name, expected_sha256)? {
            ModelStatus::Ready { path, .. } => Ok(path),
            ModelStatus::Missing { path } => {
                Err(VisionError::Model(format!("Model file not found: {:?}", path)))
            }
            ModelStatus::ChecksumMismatch { path, expected, actual } => Err(VisionError::Model(format!(
                "Checksum mismatch for {:?}: expected {}, got {}",
                path, expected, actual
            ))),
        }
    }
}

/// Hex SHA-256 of a file, streamed in chunks
pub fn sha256_file(path: &Path) -> Result<String, VisionError> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
