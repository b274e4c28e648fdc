//! DeviceSession - one paired device and its companion apps.
//!
//! A session owns the device's [`ConnectionStatus`] and one
//! [`AppStatusTracker`] per catalog app. All mutations go through a
//! `tokio::sync::Mutex`, so at most one is in flight per session while
//! different sessions proceed independently.
//!
//! Pushes are fire-and-forget: [`DeviceSession::push_readings`] picks the
//! targets, spawns one delivery task per target and returns. Each delivery
//! task follows the configured [`DeliveryPolicy`] and logs every attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use companion_core::{CompanionCatalog, DeliveryPolicy, InboundCommand};
use companion_types::{
    AppId, AppStatus, CompanionApp, ConnectionStatus, Device, DeviceId, GlucoseReading,
    PayloadError, ReadingPayload,
};
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::SyncSettings;
use crate::provider::ConnectivityProvider;
use crate::readings::ReadingSource;
use crate::tracker::AppStatusTracker;

/// Reasons a push was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    /// No readings were available.
    #[error("no readings available")]
    NoData,

    /// Pushing is switched off in the configuration.
    #[error("pushing is disabled")]
    Disabled,
}

impl From<PayloadError> for PushError {
    fn from(e: PayloadError) -> Self {
        match e {
            PayloadError::NoData => PushError::NoData,
        }
    }
}

/// What a push was scheduled to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// Apps a delivery task was spawned for.
    pub targets: Vec<AppId>,
    /// Records in the payload.
    pub records: usize,
}

/// Status of one catalog app, as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSnapshot {
    /// The app.
    pub app: CompanionApp,
    /// Its status on this device.
    pub status: AppStatus,
}

/// Read-only view of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    /// The device.
    pub device: Device,
    /// Its connection status.
    pub status: ConnectionStatus,
    /// Catalog apps in catalog order.
    pub apps: Vec<AppSnapshot>,
}

struct SessionState {
    status: ConnectionStatus,
    trackers: Vec<AppStatusTracker>,
}

impl SessionState {
    fn apply_status(&mut self, status: ConnectionStatus) {
        self.status = status;
        if !status.is_connected() {
            for tracker in &mut self.trackers {
                tracker.mark_disconnected();
            }
        }
    }
}

/// One paired device and its companion apps.
pub struct DeviceSession<P, R> {
    device: Device,
    provider: Arc<P>,
    readings: Arc<R>,
    settings: Arc<SyncSettings>,
    state: Mutex<SessionState>,
    refresh_lock: Mutex<()>,
    retired: AtomicBool,
}

impl<P, R> DeviceSession<P, R>
where
    P: ConnectivityProvider,
    R: ReadingSource,
{
    /// Create a session exposing every app in `catalog`.
    ///
    /// The initial status is whatever the provider reports now; a failed
    /// query counts as `NotConnected`.
    pub fn new(
        device: Device,
        catalog: &CompanionCatalog,
        provider: Arc<P>,
        readings: Arc<R>,
        settings: Arc<SyncSettings>,
    ) -> Self {
        let trackers = catalog
            .apps()
            .iter()
            .map(|app| AppStatusTracker::new(device.id.clone(), app.clone()))
            .collect();
        let status = query_status(provider.as_ref(), &device.id);

        Self {
            device,
            provider,
            readings,
            settings,
            state: Mutex::new(SessionState { status, trackers }),
            refresh_lock: Mutex::new(()),
            retired: AtomicBool::new(false),
        }
    }

    /// The device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The device id.
    pub fn id(&self) -> &DeviceId {
        &self.device.id
    }

    /// Current connection status.
    pub async fn status(&self) -> ConnectionStatus {
        self.state.lock().await.status
    }

    /// Re-query the connection status from the provider.
    pub async fn refresh_status(&self) -> ConnectionStatus {
        let status = query_status(self.provider.as_ref(), &self.device.id);
        self.apply_status(status).await;
        status
    }

    /// Record a status reported by the provider.
    ///
    /// Leaving `Connected` drops every app's message registration.
    pub async fn apply_status(&self, status: ConnectionStatus) {
        let mut state = self.state.lock().await;
        if state.status != status {
            tracing::info!(
                "Device {} status: {} -> {}",
                self.device.display_name,
                state.status,
                status
            );
        }
        state.apply_status(status);
    }

    /// Refresh install and registration state of every catalog app.
    ///
    /// No-op unless the device is `Connected`. Trackers are refreshed
    /// concurrently and a failure of one does not affect the others.
    ///
    /// The state lock is not held while the provider answers, so status
    /// updates for this device never wait on a refresh. Results are committed
    /// against the status current at commit time: if the device left
    /// `Connected` meanwhile, registrations are dropped again.
    pub async fn refresh_apps(&self) {
        let _refreshing = self.refresh_lock.lock().await;

        let (connection, mut trackers) = {
            let state = self.state.lock().await;
            (state.status, state.trackers.clone())
        };
        if !connection.is_connected() {
            tracing::debug!(
                "Skipping app refresh for {}: {}",
                self.device.display_name,
                connection
            );
            return;
        }

        let provider = self.provider.as_ref();
        let results = join_all(
            trackers
                .iter_mut()
                .map(|tracker| tracker.refresh(provider, connection)),
        )
        .await;

        for (tracker, result) in trackers.iter().zip(results) {
            match result {
                Ok(status) => tracing::debug!(
                    "{} on {}: installed={} registered={}",
                    tracker.app().display_name,
                    self.device.display_name,
                    status.is_installed,
                    status.is_message_registered
                ),
                Err(e) => tracing::warn!(
                    "App status query failed for {} on {}: {}",
                    tracker.app().display_name,
                    self.device.display_name,
                    e
                ),
            }
        }

        let mut state = self.state.lock().await;
        state.trackers = trackers;
        if !state.status.is_connected() {
            tracing::debug!(
                "{} left Connected during app refresh",
                self.device.display_name
            );
            let status = state.status;
            state.apply_status(status);
        }
    }

    /// Current status of every catalog app.
    pub async fn app_statuses(&self) -> Vec<AppSnapshot> {
        let state = self.state.lock().await;
        state
            .trackers
            .iter()
            .map(|tracker| AppSnapshot {
                app: tracker.app().clone(),
                status: tracker.status(),
            })
            .collect()
    }

    /// Read-only view of the session.
    pub async fn snapshot(&self) -> DeviceSnapshot {
        let status = self.status().await;
        DeviceSnapshot {
            device: self.device.clone(),
            status,
            apps: self.app_statuses().await,
        }
    }

    /// Push readings (newest first) to every installed and registered app.
    ///
    /// Returns once delivery tasks are spawned; sends are never awaited here.
    pub async fn push_readings(
        &self,
        readings: &[GlucoseReading],
    ) -> Result<PushReport, PushError> {
        if !self.settings.enabled {
            tracing::info!("Push to {} skipped: disabled", self.device.display_name);
            return Err(PushError::Disabled);
        }

        let payload = match ReadingPayload::from_readings(readings) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::info!("Push to {} skipped: {}", self.device.display_name, e);
                return Err(e.into());
            }
        };

        let targets: Vec<AppId> = {
            let state = self.state.lock().await;
            state
                .trackers
                .iter()
                .filter(|tracker| tracker.status().is_deliverable())
                .map(|tracker| tracker.app().app_id)
                .collect()
        };

        let policy = self.settings.delivery_policy();
        for app_id in &targets {
            tokio::spawn(deliver(
                self.provider.clone(),
                self.device.id.clone(),
                *app_id,
                payload.clone(),
                policy,
            ));
        }

        tracing::debug!(
            "Pushing {} readings to {} apps on {}",
            payload.len(),
            targets.len(),
            self.device.display_name
        );

        Ok(PushReport {
            targets,
            records: payload.len(),
        })
    }

    /// Fetch the latest readings and push them.
    pub async fn push_latest(&self) -> Result<PushReport, PushError> {
        if !self.settings.enabled {
            tracing::info!("Push to {} skipped: disabled", self.device.display_name);
            return Err(PushError::Disabled);
        }

        let readings = self
            .readings
            .latest_readings(self.settings.reading_limit, self.settings.lookback())
            .await;
        self.push_readings(&readings).await
    }

    /// Handle a message sent by a companion app.
    ///
    /// `getData` and `forceGetData` trigger a push of the latest readings;
    /// anything else is ignored.
    pub async fn handle_incoming_request(
        &self,
        app_id: &AppId,
        command: &str,
    ) -> Option<PushReport> {
        match InboundCommand::parse(command) {
            Some(cmd) if cmd.requests_readings() => {
                tracing::info!(
                    "App {} on {} requested data ({:?})",
                    app_id,
                    self.device.display_name,
                    cmd
                );
                self.push_latest().await.ok()
            }
            _ => {
                tracing::debug!(
                    "Ignoring message {:?} from app {} on {}",
                    command,
                    app_id,
                    self.device.display_name
                );
                None
            }
        }
    }

    /// Mark the session as replaced. Pending delayed work for it is abandoned.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    /// Whether the session has been replaced or forgotten.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }
}

fn query_status<P: ConnectivityProvider>(provider: &P, device_id: &DeviceId) -> ConnectionStatus {
    match provider.status(device_id) {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!("Status query failed for {}: {}", device_id, e);
            ConnectionStatus::NotConnected
        }
    }
}

async fn deliver<P: ConnectivityProvider>(
    provider: Arc<P>,
    device_id: DeviceId,
    app_id: AppId,
    payload: ReadingPayload,
    policy: DeliveryPolicy,
) {
    let delays = policy.attempt_delays();
    let attempts = delays.len();

    for (attempt, delay) in delays.into_iter().enumerate() {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match provider.send_message(&device_id, &app_id, &payload).await {
            Ok(report) => tracing::info!(
                "Sent {} readings to app {} on {} (attempt {}/{}, {}/{} bytes)",
                payload.len(),
                app_id,
                device_id,
                attempt + 1,
                attempts,
                report.bytes_sent,
                report.bytes_total
            ),
            Err(e) => tracing::warn!(
                "Send to app {} on {} failed (attempt {}/{}): {}",
                app_id,
                device_id,
                attempt + 1,
                attempts,
                e
            ),
        }
    }
}
