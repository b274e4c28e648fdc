//! # companion-engine
//!
//! Keeps paired wearable devices supplied with the latest glucose readings.
//!
//! The engine tracks which devices are known, whether each is connected,
//! which companion apps are installed on it, and pushes readings to those
//! apps when they ask for them.
//!
//! ## Features
//!
//! - **Provider Abstraction**: the device SDK sits behind [`ConnectivityProvider`]
//! - **Single Owner**: one task owns the [`DeviceRegistry`]; everything else
//!   talks to it through a [`RegistryHandle`]
//! - **Pure Transitions**: registration and delivery rules come from `companion-core`
//! - **Persistence**: the known device list survives restarts ([`DeviceStore`])
//!
//! ## Example
//!
//! ```ignore
//! use companion_engine::{DeviceRegistry, EngineConfig, MockProvider, RegistryHandle, StaticReadings};
//!
//! let config = EngineConfig::default();
//! let store = config.storage.store()?;
//! let provider = Arc::new(MockProvider::new());
//! let registry = DeviceRegistry::new(config, store, provider.clone(), Arc::new(StaticReadings::default()));
//!
//! let (handle, _task) = RegistryHandle::spawn(registry);
//! provider.set_event_sink(handle.provider_events());
//! handle.discover().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod handle;
pub mod provider;
pub mod readings;
pub mod registry;
pub mod session;
pub mod store;
pub mod tracker;

pub use config::{ConfigError, EngineConfig, StorageConfig, SyncSettings};
pub use handle::{EngineError, RegistryHandle};
pub use provider::{
    ConnectivityProvider, MockProvider, ProviderEvent, RegistrationCall, SendReport, SentMessage,
};
pub use readings::{ReadingSource, StaticReadings};
pub use registry::{DeviceRegistry, RegistryNotification};
pub use session::{AppSnapshot, DeviceSession, DeviceSnapshot, PushError, PushReport};
pub use store::{DeviceStore, StoreError, StoredDevices, STORE_VERSION};
pub use tracker::AppStatusTracker;
