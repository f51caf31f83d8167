//! Configuration types for GridQuota
//!
//! Loaded from a TOML file; every section falls back to its defaults when
//! omitted.

use crate::error::{Error, Result};
use crate::types::ListMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration for GridQuota
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document storage configuration
    pub storage: StorageConfig,
    /// Listing configuration
    pub listing: ListingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// read or parsed is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::configuration(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Document storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one document per user
    pub root: PathBuf,
    /// File extension of quota documents
    pub extension: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/etc/grid-router/quota"),
            extension: "xml".to_string(),
        }
    }
}

/// Listing configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Default ordering policy when the caller does not pick one
    pub mode: ListMode,
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.root, PathBuf::from("/etc/grid-router/quota"));
        assert_eq!(config.storage.extension, "xml");
        assert_eq!(config.listing.mode, ListMode::Sorted);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml_str(
            r#"
            [storage]
            root = "/srv/quota"

            [listing]
            mode = "raw"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.root, PathBuf::from("/srv/quota"));
        assert_eq!(config.storage.extension, "xml");
        assert_eq!(config.listing.mode, ListMode::Raw);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_listing_mode_is_case_insensitive() {
        let config = Config::from_toml_str("[listing]\nmode = \"RAW\"\n").unwrap();
        assert_eq!(config.listing.mode, ListMode::Raw);
        let config = Config::from_toml_str("[listing]\nmode = \"Sorted\"\n").unwrap();
        assert_eq!(config.listing.mode, ListMode::Sorted);
        assert_eq!("RAW".parse::<ListMode>().unwrap(), ListMode::Raw);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.listing.mode, ListMode::Sorted);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gridquota.toml");
        std::fs::write(&path, "[listing]\nmode = \"shuffled\"\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
