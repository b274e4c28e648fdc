//! Configuration loading for the companion engine.
//!
//! Configuration is loaded from a TOML file. Every field has a default, so an
//! empty file (or no file at all) yields a working configuration.

use crate::store::{DeviceStore, StoreError};
use companion_core::{CompanionCatalog, DeliveryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Push and refresh behaviour.
    #[serde(default)]
    pub sync: SyncSettings,
    /// Where the device list is persisted.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Companion apps exposed by every device session.
    #[serde(default)]
    pub apps: CompanionCatalog,
}

/// Push and refresh behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Push readings to devices at all (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Grace period before refreshing apps of a reconnected device (default: 1000).
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Delay before the second delivery attempt (default: 5).
    #[serde(default = "default_repeat_delay_secs")]
    pub repeat_delay_secs: u64,
    /// Readings per push (default: 2).
    #[serde(default = "default_reading_limit")]
    pub reading_limit: usize,
    /// How far back to look for readings (default: 30).
    #[serde(default = "default_lookback_minutes")]
    pub lookback_minutes: u64,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the device list (default: platform application-support dir).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// File name of the device list (default: `devices.json`).
    #[serde(default = "default_devices_file")]
    pub devices_file: String,
}

// Default value functions
fn default_enabled() -> bool {
    true
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_repeat_delay_secs() -> u64 {
    5
}

fn default_reading_limit() -> usize {
    companion_types::MAX_PAYLOAD_READINGS
}

fn default_lookback_minutes() -> u64 {
    30
}

fn default_devices_file() -> String {
    "devices.json".to_string()
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            settle_delay_ms: default_settle_delay_ms(),
            repeat_delay_secs: default_repeat_delay_secs(),
            reading_limit: default_reading_limit(),
            lookback_minutes: default_lookback_minutes(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            devices_file: default_devices_file(),
        }
    }
}

impl SyncSettings {
    /// Grace period before refreshing apps of a reconnected device.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// How each push is delivered.
    pub fn delivery_policy(&self) -> DeliveryPolicy {
        DeliveryPolicy::send_twice(Duration::from_secs(self.repeat_delay_secs))
    }

    /// Reading lookback window.
    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_minutes.saturating_mul(60))
    }
}

impl StorageConfig {
    /// Open the device store this configuration points at.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoLocation`] if no `data_dir` is set and the
    /// platform has no application-support directory.
    pub fn store(&self) -> Result<DeviceStore, StoreError> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => DeviceStore::default_dir()?,
        };
        Ok(DeviceStore::new(dir.join(&self.devices_file)))
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed. An invalid app
    /// catalog (empty or with duplicate ids) is a parse error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use companion_core::{DATA_FIELD_APP_ID, WATCH_FACE_APP_ID};
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.sync.enabled);
        assert_eq!(config.sync.settle_delay(), Duration::from_secs(1));
        assert_eq!(config.sync.reading_limit, 2);
        assert_eq!(config.sync.lookback(), Duration::from_secs(30 * 60));
        assert_eq!(config.storage.devices_file, "devices.json");
        assert_eq!(config.apps.len(), 2);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [sync]
            enabled = false
            settle_delay_ms = 250
            repeat_delay_secs = 3
            reading_limit = 1
            lookback_minutes = 10

            [storage]
            data_dir = "/var/lib/companion"
            devices_file = "paired.json"

            [[apps]]
            display_name = "Face"
            app_id = "072d1d77-05ce-43b6-b889-c32169598401"
        "#;

        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert!(!config.sync.enabled);
        assert_eq!(config.sync.settle_delay(), Duration::from_millis(250));
        assert_eq!(
            config.sync.delivery_policy(),
            DeliveryPolicy::send_twice(Duration::from_secs(3))
        );
        assert_eq!(
            config.storage.data_dir,
            Some(PathBuf::from("/var/lib/companion"))
        );
        assert_eq!(config.apps.len(), 1);
        assert_eq!(config.apps.apps()[0].app_id, WATCH_FACE_APP_ID);
        assert_eq!(config.apps.apps()[0].display_name, "Face");
    }

    #[test]
    fn partial_section_fills_defaults() {
        let config: EngineConfig = toml::from_str("[sync]\nenabled = false\n").unwrap();
        assert!(!config.sync.enabled);
        assert_eq!(config.sync.repeat_delay_secs, 5);
        assert!(config.apps.get(&DATA_FIELD_APP_ID).is_some());
    }

    #[test]
    fn huge_lookback_saturates() {
        let config: EngineConfig =
            toml::from_str("[sync]\nlookback_minutes = 9223372036854775807\n").unwrap();
        assert_eq!(config.sync.lookback(), Duration::from_secs(u64::MAX));

        let settings = SyncSettings {
            lookback_minutes: u64::MAX,
            ..SyncSettings::default()
        };
        assert_eq!(settings.lookback(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn duplicate_apps_rejected() {
        let toml = r#"
            [[apps]]
            display_name = "one"
            app_id = "072d1d77-05ce-43b6-b889-c32169598401"

            [[apps]]
            display_name = "two"
            app_id = "072d1d77-05ce-43b6-b889-c32169598401"
        "#;

        let result: Result<EngineConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn storage_with_explicit_dir() {
        let storage = StorageConfig {
            data_dir: Some(PathBuf::from("/tmp/companion")),
            devices_file: "d.json".into(),
        };
        let store = storage.store().unwrap();
        assert_eq!(store.path(), Path::new("/tmp/companion/d.json"));
    }

    // ===========================================
    // File Loading Tests
    // ===========================================

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync]\nreading_limit = 1").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.sync.reading_limit, 1);
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = EngineConfig::from_file(Path::new("/nonexistent/companion.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync\nenabled = ").unwrap();

        let result = EngineConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = EngineConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
