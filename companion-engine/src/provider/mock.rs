//! Mock connectivity provider for testing.
//!
//! Scripted device statuses and install states, captured registration calls
//! and sends, and one-shot failure injection.

use super::{ConnectivityProvider, ProviderEvent, SendReport};
use async_trait::async_trait;
use companion_types::{
    AppId, ConnectionStatus, ConnectivityError, Device, DeviceId, ReadingPayload,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// A captured `set_message_registration` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationCall {
    /// Target device.
    pub device_id: DeviceId,
    /// Target app.
    pub app_id: AppId,
    /// Requested registration state.
    pub enabled: bool,
}

/// A captured `send_message` call.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Target device.
    pub device_id: DeviceId,
    /// Target app.
    pub app_id: AppId,
    /// Payload as sent.
    pub payload: ReadingPayload,
    /// When the attempt started.
    pub at: Instant,
}

/// Mock provider for testing and demos.
///
/// Clones share state, so a test can keep a clone while the engine owns another.
#[derive(Debug, Default, Clone)]
pub struct MockProvider {
    inner: Arc<Mutex<MockProviderInner>>,
}

#[derive(Debug, Default)]
struct MockProviderInner {
    statuses: HashMap<DeviceId, ConnectionStatus>,
    installed: HashSet<(DeviceId, AppId)>,
    pending_discovery: Option<Vec<Device>>,
    event_sink: Option<mpsc::UnboundedSender<ProviderEvent>>,
    event_registrations: HashSet<DeviceId>,
    discover_calls: usize,
    install_queries: Vec<(DeviceId, AppId)>,
    registrations: Vec<RegistrationCall>,
    sent: Vec<SentMessage>,
    fail_next_status: Option<String>,
    fail_install_queries: HashSet<(DeviceId, AppId)>,
    fail_next_send: Option<String>,
}

impl MockProvider {
    /// Create a new mock provider. Unknown devices report `Invalid`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `discover_devices()` results and `emit()` calls to this channel.
    pub fn set_event_sink(&self, sink: mpsc::UnboundedSender<ProviderEvent>) {
        let mut inner = self.inner.lock().unwrap();
        inner.event_sink = Some(sink);
    }

    /// Devices returned by the next `discover_devices()` call.
    pub fn queue_discovery(&self, devices: Vec<Device>) {
        let mut inner = self.inner.lock().unwrap();
        inner.pending_discovery = Some(devices);
    }

    /// Set the status reported for a device.
    pub fn set_status(&self, device_id: &DeviceId, status: ConnectionStatus) {
        let mut inner = self.inner.lock().unwrap();
        inner.statuses.insert(device_id.clone(), status);
    }

    /// Set whether an app is installed on a device.
    pub fn set_installed(&self, device_id: &DeviceId, app_id: &AppId, installed: bool) {
        let mut inner = self.inner.lock().unwrap();
        let key = (device_id.clone(), *app_id);
        if installed {
            inner.installed.insert(key);
        } else {
            inner.installed.remove(&key);
        }
    }

    /// Push an event to the sink, as the SDK would.
    ///
    /// Returns false if no sink is attached or the receiver is gone.
    pub fn emit(&self, event: ProviderEvent) -> bool {
        let inner = self.inner.lock().unwrap();
        match &inner.event_sink {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    /// Cause the next `status()` call to fail.
    pub fn fail_next_status(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_status = Some(error.to_string());
    }

    /// Cause the next install query for this app to fail.
    pub fn fail_next_install_query(&self, device_id: &DeviceId, app_id: &AppId) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_install_queries.insert((device_id.clone(), *app_id));
    }

    /// Cause the next `send_message()` to fail.
    pub fn fail_next_send(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_send = Some(error.to_string());
    }

    /// Number of `discover_devices()` calls.
    pub fn discover_calls(&self) -> usize {
        self.inner.lock().unwrap().discover_calls
    }

    /// All install queries, in call order.
    pub fn install_queries(&self) -> Vec<(DeviceId, AppId)> {
        self.inner.lock().unwrap().install_queries.clone()
    }

    /// All registration calls, in call order.
    pub fn registrations(&self) -> Vec<RegistrationCall> {
        self.inner.lock().unwrap().registrations.clone()
    }

    /// All send attempts, in call order.
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Send attempts to one app.
    pub fn sent_to(&self, device_id: &DeviceId, app_id: &AppId) -> Vec<SentMessage> {
        self.inner
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|m| &m.device_id == device_id && &m.app_id == app_id)
            .cloned()
            .collect()
    }

    /// Whether status events are registered for a device.
    pub fn is_registered_for_events(&self, device_id: &DeviceId) -> bool {
        self.inner
            .lock()
            .unwrap()
            .event_registrations
            .contains(device_id)
    }

    /// Forget captured calls, keeping scripted statuses and installs.
    pub fn clear_history(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.install_queries.clear();
        inner.registrations.clear();
        inner.sent.clear();
        inner.discover_calls = 0;
    }
}

#[async_trait]
impl ConnectivityProvider for MockProvider {
    async fn discover_devices(&self) -> Result<(), ConnectivityError> {
        let mut inner = self.inner.lock().unwrap();
        inner.discover_calls += 1;

        let devices = inner.pending_discovery.take().unwrap_or_default();
        let sink = inner
            .event_sink
            .as_ref()
            .ok_or_else(|| ConnectivityError::Unavailable("no event sink".into()))?;
        sink.send(ProviderEvent::DiscoveryCompleted { devices })
            .map_err(|_| ConnectivityError::Unavailable("event sink closed".into()))
    }

    fn status(&self, device_id: &DeviceId) -> Result<ConnectionStatus, ConnectivityError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_status.take() {
            return Err(ConnectivityError::Query(error));
        }

        Ok(inner
            .statuses
            .get(device_id)
            .copied()
            .unwrap_or(ConnectionStatus::Invalid))
    }

    async fn app_installed(
        &self,
        device_id: &DeviceId,
        app_id: &AppId,
    ) -> Result<bool, ConnectivityError> {
        let mut inner = self.inner.lock().unwrap();
        let key = (device_id.clone(), *app_id);
        inner.install_queries.push(key.clone());

        if inner.fail_install_queries.remove(&key) {
            return Err(ConnectivityError::Query(format!(
                "app status unavailable for {}",
                app_id
            )));
        }

        Ok(inner.installed.contains(&key))
    }

    async fn set_message_registration(&self, device_id: &DeviceId, app_id: &AppId, enabled: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.registrations.push(RegistrationCall {
            device_id: device_id.clone(),
            app_id: *app_id,
            enabled,
        });
    }

    async fn send_message(
        &self,
        device_id: &DeviceId,
        app_id: &AppId,
        payload: &ReadingPayload,
    ) -> Result<SendReport, ConnectivityError> {
        let mut inner = self.inner.lock().unwrap();
        inner.sent.push(SentMessage {
            device_id: device_id.clone(),
            app_id: *app_id,
            payload: payload.clone(),
            at: Instant::now(),
        });

        if let Some(error) = inner.fail_next_send.take() {
            return Err(ConnectivityError::SendFailed(error));
        }

        let bytes_total = payload.to_json().map(|json| json.len()).unwrap_or(0) as u32;
        Ok(SendReport {
            bytes_sent: bytes_total,
            bytes_total,
        })
    }

    fn register_device_events(&self, device_id: &DeviceId) {
        let mut inner = self.inner.lock().unwrap();
        inner.event_registrations.insert(device_id.clone());
    }

    fn unregister_device_events(&self, device_id: &DeviceId) {
        let mut inner = self.inner.lock().unwrap();
        inner.event_registrations.remove(device_id);
    }
}
