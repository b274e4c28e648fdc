//! Companion applications and their per-device status.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppId;

/// Identity of an installable application on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionApp {
    /// Application identifier used by the connectivity provider.
    pub app_id: AppId,
    /// Store listing identifier (nil when the app is side-loaded).
    #[serde(default)]
    pub store_id: Uuid,
    /// Name used in logs and UIs.
    pub display_name: String,
}

impl CompanionApp {
    /// Create a new companion app with a nil store id.
    pub fn new(app_id: AppId, display_name: impl Into<String>) -> Self {
        Self {
            app_id,
            store_id: Uuid::nil(),
            display_name: display_name.into(),
        }
    }

    /// Set the store id.
    pub fn with_store_id(mut self, store_id: Uuid) -> Self {
        self.store_id = store_id;
        self
    }
}

/// Install and message-registration state of one app on one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStatus {
    /// The app is installed on the device.
    pub is_installed: bool,
    /// The engine is registered to exchange messages with the app.
    ///
    /// Only ever true while `is_installed` is true and the device is connected.
    pub is_message_registered: bool,
}

impl AppStatus {
    /// The app can receive a reading push right now.
    pub fn is_deliverable(&self) -> bool {
        self.is_installed && self.is_message_registered
    }
}
