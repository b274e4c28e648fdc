//! Persisted device list.
//!
//! Only device identities are stored; app status is always re-derived live.
//! Saves go through a temp file in the same directory followed by a rename,
//! so a failed save leaves the previous file intact.

use companion_types::Device;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current on-disk format version.
pub const STORE_VERSION: u32 = 1;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("device store I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not a valid device list.
    #[error("device store at {path} is corrupt: {source}")]
    Corrupt {
        /// The store file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The file was written by an unknown format version.
    #[error("unsupported device store version {0}")]
    UnsupportedVersion(u32),

    /// No application-support directory could be determined.
    #[error("could not determine application data directory")]
    NoLocation,
}

/// On-disk layout of the device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDevices {
    /// Format version.
    pub version: u32,
    /// Devices in registry order.
    pub devices: Vec<Device>,
}

/// Single-file store for the known device list.
#[derive(Debug, Clone)]
pub struct DeviceStore {
    path: PathBuf,
}

impl DeviceStore {
    /// Create a store backed by the given file. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store for `devices.json` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("devices.json"))
    }

    /// Platform application-support directory for the engine.
    pub fn default_dir() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("org", "cgm-companion", "companion")
            .ok_or(StoreError::NoLocation)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the persisted device list.
    ///
    /// Creates the parent directory on first use.
    pub fn save(&self, devices: &[Device]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let stored = StoredDevices {
            version: STORE_VERSION,
            devices: devices.to_vec(),
        };
        let serialized = serde_json::to_vec_pretty(&stored).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            source: e,
        })?;

        let temp_path = self.temp_path();
        if let Err(e) = write_synced(&temp_path, &serialized) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Io {
                path: temp_path,
                source: e,
            });
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::Io {
                path: self.path.clone(),
                source: e,
            }
        })?;

        tracing::debug!("Saved {} devices to {}", devices.len(), self.path.display());
        Ok(())
    }

    /// Load the persisted device list.
    ///
    /// A missing file is an I/O error; callers treat any error as "no devices".
    pub fn load(&self) -> Result<Vec<Device>, StoreError> {
        let content = fs::read(&self.path).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        let stored: StoredDevices =
            serde_json::from_slice(&content).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                source: e,
            })?;

        if stored.version != STORE_VERSION {
            return Err(StoreError::UnsupportedVersion(stored.version));
        }

        Ok(stored.devices)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
