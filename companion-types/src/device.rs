//! Paired devices and their live connectivity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DeviceId;

/// Identity of a paired physical unit.
///
/// Immutable once discovered. This is the only device data that is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Opaque unique identifier.
    pub id: DeviceId,
    /// User-facing name ("Forerunner of Alex").
    pub display_name: String,
    /// Hardware model ("Forerunner 265").
    pub model_name: String,
}

impl Device {
    /// Create a new device identity.
    pub fn new(
        id: impl Into<DeviceId>,
        display_name: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            model_name: model_name.into(),
        }
    }
}

/// Live connection status of a device as reported by the connectivity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// The provider does not recognise the device.
    Invalid,
    /// Bluetooth is off or not ready on the phone.
    BluetoothUnavailable,
    /// The device is known but could not be found.
    NotFound,
    /// The device is known but not currently connected.
    NotConnected,
    /// The device is connected and reachable.
    Connected,
}

impl ConnectionStatus {
    /// Check if the device is connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Human-readable label, as shown in device lists.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Invalid => "Invalid Device",
            Self::BluetoothUnavailable => "Bluetooth Off",
            Self::NotFound => "Not Found",
            Self::NotConnected => "Not Connected",
            Self::Connected => "Connected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
