//! Connectivity provider abstraction.
//!
//! The provider is the black-box device SDK: it runs device selection, answers
//! status and install queries, and carries messages to installed apps. The
//! engine only consumes it through [`ConnectivityProvider`].
//!
//! # Design
//!
//! Queries and sends are request/response calls on the trait. Everything the
//! SDK pushes on its own (discovery results, status changes, inbound app
//! messages) is delivered as a [`ProviderEvent`] on the registry's inbound
//! channel instead of as callbacks, so a single owner processes them in order.
//!
//! ```ignore
//! let (handle, task) = RegistryHandle::spawn(registry);
//! provider.set_event_sink(handle.provider_events());
//! handle.discover().await?;
//! ```

mod mock;

pub use mock::{MockProvider, RegistrationCall, SentMessage};

use async_trait::async_trait;
use companion_types::{AppId, ConnectionStatus, ConnectivityError, Device, DeviceId, ReadingPayload};

/// Completion report of one message send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Bytes handed to the device.
    pub bytes_sent: u32,
    /// Total size of the encoded message.
    pub bytes_total: u32,
}

impl SendReport {
    /// Whether every byte was sent.
    pub fn is_complete(&self) -> bool {
        self.bytes_sent >= self.bytes_total
    }
}

/// Events pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The user finished (or dismissed) external device selection.
    DiscoveryCompleted {
        /// Selected devices, possibly empty.
        devices: Vec<Device>,
    },
    /// A registered device changed connection status.
    StatusChanged {
        /// The device.
        device_id: DeviceId,
        /// Its new status.
        status: ConnectionStatus,
    },
    /// A companion app sent a message to the phone.
    MessageReceived {
        /// The device the app runs on.
        device_id: DeviceId,
        /// The app that sent the message.
        app_id: AppId,
        /// Raw command string.
        command: String,
    },
}

/// Capabilities the engine needs from the device SDK.
///
/// Implementations must be cheap to call concurrently; the engine calls them
/// from its event loop and from spawned delivery tasks.
#[async_trait]
pub trait ConnectivityProvider: Send + Sync + 'static {
    /// Start external device selection.
    ///
    /// The result arrives later as [`ProviderEvent::DiscoveryCompleted`].
    async fn discover_devices(&self) -> Result<(), ConnectivityError>;

    /// Query the current connection status of a device.
    fn status(&self, device_id: &DeviceId) -> Result<ConnectionStatus, ConnectivityError>;

    /// Query whether an app is installed on a device.
    async fn app_installed(
        &self,
        device_id: &DeviceId,
        app_id: &AppId,
    ) -> Result<bool, ConnectivityError>;

    /// Enable or disable message exchange with an app. Idempotent.
    async fn set_message_registration(&self, device_id: &DeviceId, app_id: &AppId, enabled: bool);

    /// Send a payload to an app and wait for the SDK's completion.
    async fn send_message(
        &self,
        device_id: &DeviceId,
        app_id: &AppId,
        payload: &ReadingPayload,
    ) -> Result<SendReport, ConnectivityError>;

    /// Start delivering [`ProviderEvent::StatusChanged`] events for a device.
    fn register_device_events(&self, device_id: &DeviceId);

    /// Stop delivering status events for a device.
    fn unregister_device_events(&self, device_id: &DeviceId);
}
