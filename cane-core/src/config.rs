//! Config-file loading shared by every cane binary

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Supported on-disk configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
            Some(ext) if ext == "toml" => Ok(Self::Toml),
            Some(ext) if ext == "yaml" || ext == "yml" => Ok(Self::Yaml),
            Some(ext) if ext == "json" => Ok(Self::Json),
            _ => Err(Error::Configuration(format!(
                "Unsupported config file extension: {}",
                path.display()
            ))),
        }
    }
}

/// Parse configuration text in the given format
pub fn parse<T: DeserializeOwned>(text: &str, format: ConfigFormat) -> Result<T> {
    match format {
        ConfigFormat::Toml => toml::from_str(text).map_err(|e| Error::Deserialization(e.to_string())),
        ConfigFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|e| Error::Deserialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(text).map_err(|e| Error::Deserialization(e.to_string()))
        }
    }
}

/// Read and parse a configuration file, choosing the format by extension
pub fn load_from_path<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = ConfigFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    parse(&text, format)
}

/// Render configuration as TOML
pub fn to_toml<T: Serialize>(value: &T) -> Result<String> {
    toml::to_string_pretty(value).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Sample {
        threshold: f32,
        name: String,
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_parse_all_formats() {
        let expected = Sample { threshold: 0.5, name: "cane".to_string() };
        let toml_text = "threshold = 0.5\nname = \"cane\"\n";
        let yaml_text = "threshold: 0.5\nname: cane\n";
        let json_text = r#"{"threshold": 0.5, "name": "cane"}"#;
        assert_eq!(parse::<Sample>(toml_text, ConfigFormat::Toml).unwrap(), expected);
        assert_eq!(parse::<Sample>(yaml_text, ConfigFormat::Yaml).unwrap(), expected);
        assert_eq!(parse::<Sample>(json_text, ConfigFormat::Json).unwrap(), expected);
    }

    #[test]
    fn test_parse_error_is_deserialization() {
        let err = parse::<Sample>("threshold = ", ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn test_load_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cane.yaml");
        std::fs::write(&path, "threshold: 0.25\nname: hall\n").unwrap();

        let loaded: Sample = load_from_path(&path).unwrap();
        assert_eq!(loaded, Sample { threshold: 0.25, name: "hall".to_string() });
    }

    #[test]
    fn test_load_from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_path::<Sample>(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
