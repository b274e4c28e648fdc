//! RegistryHandle - the registry's event loop and its command interface.
//!
//! [`RegistryHandle::spawn`] moves a [`DeviceRegistry`] into a task that
//! first restores the persisted device list, then consumes two inputs:
//!
//! - provider events (discovery results, status changes, app messages) from
//!   the sender returned by [`RegistryHandle::provider_events`]
//! - commands sent through the handle's methods
//!
//! Pending provider events are always drained before the next command, so a
//! command observes every event the provider emitted before it was issued.

use companion_types::{ConnectionStatus, ConnectivityError, DeviceId};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::provider::{ConnectivityProvider, ProviderEvent};
use crate::readings::ReadingSource;
use crate::registry::{DeviceRegistry, RegistryNotification};
use crate::session::DeviceSnapshot;

/// Capacity of the command channel.
const COMMAND_CAPACITY: usize = 32;

/// Errors returned by [`RegistryHandle`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The registry task has stopped.
    #[error("engine stopped")]
    Stopped,

    /// The provider rejected a request.
    #[error("connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),
}

enum Command {
    Discover {
        reply: oneshot::Sender<Result<(), ConnectivityError>>,
    },
    ForceSend {
        reply: oneshot::Sender<usize>,
    },
    RefreshDevice {
        device_id: DeviceId,
        reply: oneshot::Sender<Option<ConnectionStatus>>,
    },
    ForgetAll {
        reply: oneshot::Sender<()>,
    },
    Devices {
        reply: oneshot::Sender<Vec<DeviceSnapshot>>,
    },
    Shutdown,
}

/// Cloneable handle to a running registry.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    commands: mpsc::Sender<Command>,
    events: mpsc::UnboundedSender<ProviderEvent>,
    notifications: broadcast::Sender<RegistryNotification>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Discover { .. } => "Discover",
            Command::ForceSend { .. } => "ForceSend",
            Command::RefreshDevice { .. } => "RefreshDevice",
            Command::ForgetAll { .. } => "ForgetAll",
            Command::Devices { .. } => "Devices",
            Command::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl RegistryHandle {
    /// Start the registry task.
    ///
    /// The task ends after [`RegistryHandle::shutdown`] or once every handle
    /// has been dropped.
    pub fn spawn<P, R>(registry: DeviceRegistry<P, R>) -> (Self, JoinHandle<()>)
    where
        P: ConnectivityProvider,
        R: ReadingSource,
    {
        let (commands, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (events, event_rx) = mpsc::unbounded_channel();
        let notifications = registry.notifier();

        let task = tokio::spawn(run(registry, event_rx, command_rx));

        (
            Self {
                commands,
                events,
                notifications,
            },
            task,
        )
    }

    /// Sender the provider delivers its events to.
    pub fn provider_events(&self) -> mpsc::UnboundedSender<ProviderEvent> {
        self.events.clone()
    }

    /// Subscribe to registry notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryNotification> {
        self.notifications.subscribe()
    }

    /// Ask the provider to start device selection.
    ///
    /// The result is applied when the provider reports it.
    pub async fn discover(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::Discover { reply })
            .await?
            .map_err(EngineError::from)
    }

    /// Push the latest readings to every connected device.
    pub async fn force_send(&self) -> Result<usize, EngineError> {
        self.request(|reply| Command::ForceSend { reply }).await
    }

    /// Re-query one device. Returns `None` for unknown devices.
    pub async fn refresh_device(
        &self,
        device_id: DeviceId,
    ) -> Result<Option<ConnectionStatus>, EngineError> {
        self.request(|reply| Command::RefreshDevice { device_id, reply })
            .await
    }

    /// Forget every known device.
    pub async fn forget_all(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::ForgetAll { reply }).await
    }

    /// Snapshot of every known device.
    pub async fn devices(&self) -> Result<Vec<DeviceSnapshot>, EngineError> {
        self.request(|reply| Command::Devices { reply }).await
    }

    /// Stop the registry task.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| EngineError::Stopped)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| EngineError::Stopped)?;
        rx.await.map_err(|_| EngineError::Stopped)
    }
}

async fn run<P, R>(
    mut registry: DeviceRegistry<P, R>,
    mut events: mpsc::UnboundedReceiver<ProviderEvent>,
    mut commands: mpsc::Receiver<Command>,
) where
    P: ConnectivityProvider,
    R: ReadingSource,
{
    registry.restore_from_disk().await;
    tracing::info!("Registry started with {} devices", registry.sessions().len());

    loop {
        tokio::select! {
            biased;

            Some(event) = events.recv() => {
                registry.handle_event(event).await;
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                tracing::debug!("Registry command: {:?}", command);
                if !execute(&mut registry, command).await {
                    break;
                }
            }
        }
    }

    tracing::info!("Registry stopped");
}

/// Run one command. Returns false on shutdown.
async fn execute<P, R>(registry: &mut DeviceRegistry<P, R>, command: Command) -> bool
where
    P: ConnectivityProvider,
    R: ReadingSource,
{
    // A dropped reply receiver just means the caller stopped waiting
    match command {
        Command::Discover { reply } => {
            let result = registry.provider().discover_devices().await;
            let _ = reply.send(result);
        }
        Command::ForceSend { reply } => {
            let _ = reply.send(registry.force_send().await);
        }
        Command::RefreshDevice { device_id, reply } => {
            let _ = reply.send(registry.refresh_device(&device_id).await);
        }
        Command::ForgetAll { reply } => {
            registry.forget_all().await;
            let _ = reply.send(());
        }
        Command::Devices { reply } => {
            let _ = reply.send(registry.snapshot().await);
        }
        Command::Shutdown => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::provider::MockProvider;
    use crate::readings::StaticReadings;
    use crate::store::DeviceStore;
    use companion_core::WATCH_FACE_APP_ID;
    use companion_types::{Device, GlucoseReading};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn start(dir: &TempDir, provider: &MockProvider) -> (RegistryHandle, JoinHandle<()>) {
        let registry = DeviceRegistry::new(
            EngineConfig::default(),
            DeviceStore::in_dir(dir.path()),
            Arc::new(provider.clone()),
            Arc::new(StaticReadings::new(vec![GlucoseReading::new(
                120,
                4,
                1_700_000_000_000,
                "collector",
            )])
            .with_now_ms(1_700_000_000_000)),
        );
        let (handle, task) = RegistryHandle::spawn(registry);
        provider.set_event_sink(handle.provider_events());
        (handle, task)
    }

    #[tokio::test]
    async fn discover_applies_provider_result() {
        let dir = TempDir::new().unwrap();
        let provider = MockProvider::new();
        let (handle, _task) = start(&dir, &provider);
        provider.queue_discovery(vec![Device::new("G1", "Forerunner", "Forerunner 265")]);

        handle.discover().await.unwrap();
        let devices = handle.devices().await.unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device.id, DeviceId::new("G1"));
        assert_eq!(provider.discover_calls(), 1);
    }

    #[tokio::test]
    async fn restores_before_processing_events() {
        let dir = TempDir::new().unwrap();
        DeviceStore::in_dir(dir.path())
            .save(&[Device::new("G1", "Forerunner", "Forerunner 265")])
            .unwrap();
        let provider = MockProvider::new();
        let (handle, _task) = start(&dir, &provider);

        let devices = handle.devices().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert!(provider.is_registered_for_events(&DeviceId::new("G1")));
    }

    #[tokio::test(start_paused = true)]
    async fn provider_events_flow_through_loop() {
        let dir = TempDir::new().unwrap();
        let provider = MockProvider::new();
        let (handle, _task) = start(&dir, &provider);
        let g1 = DeviceId::new("G1");
        let mut rx = handle.subscribe();

        provider.set_installed(&g1, &WATCH_FACE_APP_ID, true);
        provider.emit(ProviderEvent::DiscoveryCompleted {
            devices: vec![Device::new("G1", "Forerunner", "Forerunner 265")],
        });
        provider.set_status(&g1, ConnectionStatus::Connected);
        provider.emit(ProviderEvent::StatusChanged {
            device_id: g1.clone(),
            status: ConnectionStatus::Connected,
        });

        assert_eq!(rx.recv().await.unwrap(), RegistryNotification::DevicesChanged);
        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryNotification::DeviceStatusChanged {
                device_id: g1.clone(),
                status: ConnectionStatus::Connected,
            }
        );

        tokio::time::sleep(Duration::from_secs(2)).await;
        provider.emit(ProviderEvent::MessageReceived {
            device_id: g1.clone(),
            app_id: WATCH_FACE_APP_ID,
            command: "getData".into(),
        });
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(provider.sent_to(&g1, &WATCH_FACE_APP_ID).len(), 2);
    }

    #[tokio::test]
    async fn forget_all_through_handle() {
        let dir = TempDir::new().unwrap();
        let provider = MockProvider::new();
        let (handle, _task) = start(&dir, &provider);
        provider.queue_discovery(vec![Device::new("G1", "Forerunner", "Forerunner 265")]);
        handle.discover().await.unwrap();

        handle.forget_all().await.unwrap();

        assert!(handle.devices().await.unwrap().is_empty());
        assert!(DeviceStore::in_dir(dir.path()).load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn shutdown_stops_task() {
        let dir = TempDir::new().unwrap();
        let provider = MockProvider::new();
        let (handle, task) = start(&dir, &provider);

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(matches!(handle.devices().await, Err(EngineError::Stopped)));
        assert!(matches!(handle.force_send().await, Err(EngineError::Stopped)));
    }

    #[tokio::test]
    async fn dropping_handles_stops_task() {
        let dir = TempDir::new().unwrap();
        let provider = MockProvider::new();
        let (handle, task) = start(&dir, &provider);

        drop(handle);

        // The provider still holds an event sender, but commands are closed
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
