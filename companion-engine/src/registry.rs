//! DeviceRegistry - the set of known device sessions.
//!
//! The registry is the single owner of the device list. It applies discovery
//! results, restores the persisted list at start-up, routes provider events
//! to sessions and fans out [`RegistryNotification`]s to observers.
//!
//! It is not shared: [`crate::RegistryHandle::spawn`] moves it into one task
//! that processes events and commands one at a time, so discovery swaps and
//! status changes never interleave.

use std::collections::HashSet;
use std::sync::Arc;

use companion_core::CompanionCatalog;
use companion_types::{AppId, ConnectionStatus, Device, DeviceId};
use tokio::sync::broadcast;

use crate::config::{EngineConfig, SyncSettings};
use crate::provider::{ConnectivityProvider, ProviderEvent};
use crate::readings::ReadingSource;
use crate::session::{DeviceSession, DeviceSnapshot, PushReport};
use crate::store::DeviceStore;

/// Capacity of the notification channel. Slow observers miss old notifications.
const NOTIFICATION_CAPACITY: usize = 64;

/// Changes observers may want to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryNotification {
    /// The set of known devices was replaced or cleared.
    DevicesChanged,
    /// A device's connection status was updated.
    DeviceStatusChanged {
        /// The device.
        device_id: DeviceId,
        /// Its status after the update.
        status: ConnectionStatus,
    },
}

/// Ordered set of device sessions.
pub struct DeviceRegistry<P, R> {
    provider: Arc<P>,
    readings: Arc<R>,
    settings: Arc<SyncSettings>,
    catalog: CompanionCatalog,
    store: DeviceStore,
    sessions: Vec<Arc<DeviceSession<P, R>>>,
    notifications: broadcast::Sender<RegistryNotification>,
}

impl<P, R> DeviceRegistry<P, R>
where
    P: ConnectivityProvider,
    R: ReadingSource,
{
    /// Create an empty registry.
    pub fn new(
        config: EngineConfig,
        store: DeviceStore,
        provider: Arc<P>,
        readings: Arc<R>,
    ) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            provider,
            readings,
            settings: Arc::new(config.sync),
            catalog: config.apps,
            store,
            sessions: Vec::new(),
            notifications,
        }
    }

    /// The connectivity provider.
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Subscribe to notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryNotification> {
        self.notifications.subscribe()
    }

    pub(crate) fn notifier(&self) -> broadcast::Sender<RegistryNotification> {
        self.notifications.clone()
    }

    /// Sessions in registry order.
    pub fn sessions(&self) -> &[Arc<DeviceSession<P, R>>] {
        &self.sessions
    }

    /// Look up a session by device id.
    pub fn session(&self, device_id: &DeviceId) -> Option<&Arc<DeviceSession<P, R>>> {
        self.sessions.iter().find(|s| s.id() == device_id)
    }

    /// Known devices in registry order.
    pub fn devices(&self) -> Vec<Device> {
        self.sessions.iter().map(|s| s.device().clone()).collect()
    }

    /// Replace the known devices with a discovery result.
    ///
    /// An empty result is ignored and returns false. Otherwise every previous
    /// session is retired and replaced, the new list is persisted and
    /// observers are notified.
    pub async fn apply_discovery_result(&mut self, devices: Vec<Device>) -> bool {
        if devices.is_empty() {
            tracing::info!(
                "Discovery returned no devices, keeping {}",
                self.sessions.len()
            );
            return false;
        }

        self.retire_sessions();
        self.install_sessions(devices).await;
        tracing::info!("Discovery replaced device list: {} devices", self.sessions.len());

        self.persist();
        self.notify(RegistryNotification::DevicesChanged);
        true
    }

    /// Rebuild sessions from the persisted device list.
    ///
    /// Load failures are logged and leave the registry empty. Returns the
    /// number of restored devices.
    pub async fn restore_from_disk(&mut self) -> usize {
        let devices = match self.store.load() {
            Ok(devices) => devices,
            Err(e) => {
                tracing::info!("No persisted devices restored: {}", e);
                return 0;
            }
        };

        self.install_sessions(devices).await;
        tracing::info!(
            "Restored {} devices from {}",
            self.sessions.len(),
            self.store.path().display()
        );

        if !self.sessions.is_empty() {
            self.notify(RegistryNotification::DevicesChanged);
        }
        self.sessions.len()
    }

    /// Apply a status reported by the provider.
    ///
    /// Events for unknown devices are dropped. A transition to `Connected`
    /// schedules an app refresh after the settle delay.
    pub async fn on_status_changed(&mut self, device_id: &DeviceId, status: ConnectionStatus) {
        let Some(session) = self.session(device_id).cloned() else {
            tracing::debug!("Dropping status {} for unknown device {}", status, device_id);
            self.notify(RegistryNotification::DeviceStatusChanged {
                device_id: device_id.clone(),
                status,
            });
            return;
        };

        session.apply_status(status).await;

        if status.is_connected() {
            let settle = self.settings.settle_delay();
            tokio::spawn(async move {
                tokio::time::sleep(settle).await;
                if session.is_retired() {
                    return;
                }
                session.refresh_apps().await;
            });
        }

        self.notify(RegistryNotification::DeviceStatusChanged {
            device_id: device_id.clone(),
            status,
        });
    }

    /// Route a message from a companion app to its session.
    pub async fn on_message_received(
        &self,
        device_id: &DeviceId,
        app_id: &AppId,
        command: &str,
    ) -> Option<PushReport> {
        let Some(session) = self.session(device_id) else {
            tracing::debug!("Dropping message from unknown device {}", device_id);
            return None;
        };
        session.handle_incoming_request(app_id, command).await
    }

    /// Push the latest readings to every connected device.
    ///
    /// Returns the number of devices a push was scheduled for.
    pub async fn force_send(&self) -> usize {
        let mut pushed = 0;
        for session in &self.sessions {
            if !session.status().await.is_connected() {
                continue;
            }
            if session.push_latest().await.is_ok() {
                pushed += 1;
            }
        }
        tracing::info!("Force send scheduled for {} devices", pushed);
        pushed
    }

    /// Re-query one device and refresh its apps right away if connected.
    pub async fn refresh_device(&mut self, device_id: &DeviceId) -> Option<ConnectionStatus> {
        let session = self.session(device_id).cloned()?;
        let status = session.refresh_status().await;
        if status.is_connected() {
            tokio::spawn(async move {
                if session.is_retired() {
                    return;
                }
                session.refresh_apps().await;
            });
        }
        self.notify(RegistryNotification::DeviceStatusChanged {
            device_id: device_id.clone(),
            status,
        });
        Some(status)
    }

    /// Discard every session and persist the empty list.
    pub async fn forget_all(&mut self) {
        let forgotten = self.sessions.len();
        self.retire_sessions();
        self.persist();
        self.notify(RegistryNotification::DevicesChanged);
        tracing::info!("Forgot {} devices", forgotten);
    }

    /// Read-only view of every session.
    pub async fn snapshot(&self) -> Vec<DeviceSnapshot> {
        let mut snapshots = Vec::with_capacity(self.sessions.len());
        for session in &self.sessions {
            snapshots.push(session.snapshot().await);
        }
        snapshots
    }

    /// Dispatch a provider event.
    pub async fn handle_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::DiscoveryCompleted { devices } => {
                self.apply_discovery_result(devices).await;
            }
            ProviderEvent::StatusChanged { device_id, status } => {
                self.on_status_changed(&device_id, status).await;
            }
            ProviderEvent::MessageReceived {
                device_id,
                app_id,
                command,
            } => {
                self.on_message_received(&device_id, &app_id, &command).await;
            }
        }
    }

    async fn install_sessions(&mut self, devices: Vec<Device>) {
        let mut seen = HashSet::with_capacity(devices.len());

        for device in devices {
            if !seen.insert(device.id.clone()) {
                tracing::warn!("Ignoring duplicate device {}", device.id);
                continue;
            }

            let session = Arc::new(DeviceSession::new(
                device,
                &self.catalog,
                self.provider.clone(),
                self.readings.clone(),
                self.settings.clone(),
            ));
            self.provider.register_device_events(session.id());

            if session.status().await.is_connected() {
                let session = session.clone();
                tokio::spawn(async move {
                    if !session.is_retired() {
                        session.refresh_apps().await;
                    }
                });
            }

            self.sessions.push(session);
        }
    }

    fn retire_sessions(&mut self) {
        for session in self.sessions.drain(..) {
            session.retire();
            self.provider.unregister_device_events(session.id());
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.devices()) {
            tracing::warn!("Failed to persist device list: {}", e);
        }
    }

    fn notify(&self, notification: RegistryNotification) {
        // No receivers is fine
        let _ = self.notifications.send(notification);
    }
}
