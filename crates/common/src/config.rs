//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the persisted key-value store (presets, activity log).
    pub data_dir: PathBuf,

    /// Default export settings.
    #[serde(default)]
    pub export: ExportDefaults,

    /// Font used to measure and rasterize text watermarks.
    #[serde(default)]
    pub fonts: FontConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Output mime type (`image/png`, `image/jpeg`, `image/webp`).
    pub format: String,

    /// Output quality, 0-100.
    pub quality: u8,

    /// What a batch does when one queued image fails.
    pub failure_policy: FailurePolicy,

    /// File name of the delivered batch archive.
    pub archive_name: String,
}

/// Batch failure handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// First per-image failure aborts the batch; nothing is delivered.
    #[default]
    Abort,
    /// Failed images are skipped and listed in a manifest inside the archive.
    SkipAndReport,
}

/// Font configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// TTF/OTF file to use. When unset, well-known system fonts are probed.
    pub path: Option<PathBuf>,

    /// Family label stored on newly created text marks.
    pub family: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "wmark_editor=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            export: ExportDefaults::default(),
            fonts: FontConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            format: "image/png".to_string(),
            quality: 92,
            failure_policy: FailurePolicy::Abort,
            archive_name: "watermarked_batch.zip".to_string(),
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: None,
            family: "Inter".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Path of the persisted key-value store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("wmark").join("config.json")
}

/// Default data directory.
fn default_data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("wmark")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.export.format, "image/png");
        assert_eq!(config.export.quality, 92);
        assert_eq!(config.export.failure_policy, FailurePolicy::Abort);
        assert!(config.fonts.path.is_none());
        assert!(config.store_path().ends_with("wmark/store.json"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"data_dir":"/tmp/wm","export":{"quality":50}}"#).unwrap();
        assert_eq!(parsed.export.quality, 50);
        assert_eq!(parsed.export.format, "image/png");
        assert_eq!(parsed.logging.level, "info");
        assert_eq!(parsed.fonts.family, "Inter");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.export.failure_policy = FailurePolicy::SkipAndReport;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.export.failure_policy, FailurePolicy::SkipAndReport);
    }

    #[test]
    fn test_corrupt_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded.export.quality, 92);
    }
}
