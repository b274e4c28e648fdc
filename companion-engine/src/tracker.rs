//! Per-app status tracking.
//!
//! An [`AppStatusTracker`] owns the [`AppStatus`] of one catalog app on one
//! device. Transitions come from `companion_core::registration`; the tracker
//! only performs the provider calls those transitions ask for.

use crate::provider::ConnectivityProvider;
use companion_core::{registration, AppEvent};
use companion_types::{AppStatus, CompanionApp, ConnectionStatus, ConnectivityError, DeviceId};

/// Status of one companion app on one device.
#[derive(Debug, Clone)]
pub struct AppStatusTracker {
    device_id: DeviceId,
    app: CompanionApp,
    status: AppStatus,
}

impl AppStatusTracker {
    /// Create a tracker with unknown (not installed, not registered) status.
    pub fn new(device_id: DeviceId, app: CompanionApp) -> Self {
        Self {
            device_id,
            app,
            status: AppStatus::default(),
        }
    }

    /// The tracked app.
    pub fn app(&self) -> &CompanionApp {
        &self.app
    }

    /// Read-only snapshot of the current status.
    pub fn status(&self) -> AppStatus {
        self.status
    }

    /// Query install status and update message registration accordingly.
    ///
    /// Makes exactly one registration call. On a failed query the app is
    /// treated as not installed, unregistered, and the error is returned.
    pub async fn refresh<P>(
        &mut self,
        provider: &P,
        connection: ConnectionStatus,
    ) -> Result<AppStatus, ConnectivityError>
    where
        P: ConnectivityProvider + ?Sized,
    {
        let queried = provider
            .app_installed(&self.device_id, &self.app.app_id)
            .await;

        let event = match &queried {
            Ok(installed) => AppEvent::InstallQueried {
                installed: *installed,
            },
            Err(_) => AppEvent::QueryFailed,
        };

        let (status, action) = registration::on_event(self.status, event, connection);
        self.status = status;

        if let Some(action) = action {
            provider
                .set_message_registration(&self.device_id, &self.app.app_id, action.enabled())
                .await;
        }

        queried.map(|_| status)
    }

    /// Drop message registration after the device left Connected.
    ///
    /// Local only: the device is gone, so no provider call is made.
    pub fn mark_disconnected(&mut self) {
        let (status, _) = registration::on_event(
            self.status,
            AppEvent::Disconnected,
            ConnectionStatus::NotConnected,
        );
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockProvider, RegistrationCall};
    use companion_core::WATCH_FACE_APP_ID;

    fn setup() -> (MockProvider, AppStatusTracker, DeviceId) {
        let provider = MockProvider::new();
        let device_id = DeviceId::new("G1");
        let tracker = AppStatusTracker::new(
            device_id.clone(),
            CompanionApp::new(WATCH_FACE_APP_ID, "Watchface"),
        );
        (provider, tracker, device_id)
    }

    #[tokio::test]
    async fn installed_app_gets_registered() {
        let (provider, mut tracker, device_id) = setup();
        provider.set_installed(&device_id, &WATCH_FACE_APP_ID, true);

        let status = tracker
            .refresh(&provider, ConnectionStatus::Connected)
            .await
            .unwrap();

        assert!(status.is_installed);
        assert!(status.is_message_registered);
        assert_eq!(
            provider.registrations(),
            vec![RegistrationCall {
                device_id,
                app_id: WATCH_FACE_APP_ID,
                enabled: true,
            }]
        );
    }

    #[tokio::test]
    async fn missing_app_gets_unregistered() {
        let (provider, mut tracker, _) = setup();

        let status = tracker
            .refresh(&provider, ConnectionStatus::Connected)
            .await
            .unwrap();

        assert!(!status.is_installed);
        assert!(!status.is_message_registered);
        let calls = provider.registrations();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].enabled);
    }

    #[tokio::test]
    async fn failed_query_unregisters_and_returns_error() {
        let (provider, mut tracker, device_id) = setup();
        provider.set_installed(&device_id, &WATCH_FACE_APP_ID, true);
        tracker
            .refresh(&provider, ConnectionStatus::Connected)
            .await
            .unwrap();

        provider.fail_next_install_query(&device_id, &WATCH_FACE_APP_ID);
        let result = tracker.refresh(&provider, ConnectionStatus::Connected).await;

        assert!(matches!(result, Err(ConnectivityError::Query(_))));
        assert_eq!(tracker.status(), AppStatus::default());
        let calls = provider.registrations();
        assert_eq!(calls.len(), 2);
        assert!(!calls[1].enabled);
    }

    #[tokio::test]
    async fn redundant_refresh_is_idempotent() {
        let (provider, mut tracker, device_id) = setup();
        provider.set_installed(&device_id, &WATCH_FACE_APP_ID, true);

        let first = tracker
            .refresh(&provider, ConnectionStatus::Connected)
            .await
            .unwrap();
        let second = tracker
            .refresh(&provider, ConnectionStatus::Connected)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(provider.registrations().iter().all(|call| call.enabled));
    }

    #[tokio::test]
    async fn disconnect_drops_registration_without_query() {
        let (provider, mut tracker, device_id) = setup();
        provider.set_installed(&device_id, &WATCH_FACE_APP_ID, true);
        tracker
            .refresh(&provider, ConnectionStatus::Connected)
            .await
            .unwrap();
        provider.clear_history();

        tracker.mark_disconnected();

        assert!(tracker.status().is_installed);
        assert!(!tracker.status().is_message_registered);
        assert!(provider.install_queries().is_empty());
        assert!(provider.registrations().is_empty());
    }
}
