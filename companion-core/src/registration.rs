//! App registration state machine.
//!
//! Decides how an [`AppStatus`] changes in response to install queries and
//! connectivity loss, and which registration call (if any) the engine must
//! make against the connectivity provider. NO I/O, just state transitions.
//!
//! The rule enforced here: `is_message_registered` is only ever true while the
//! app is installed and its device is connected.

use companion_types::{AppStatus, ConnectionStatus};

/// Inputs to the registration state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// An install-status query returned.
    InstallQueried {
        /// Whether the app is installed.
        installed: bool,
    },
    /// An install-status query failed.
    QueryFailed,
    /// The owning device left the Connected state.
    Disconnected,
}

/// Registration call the engine must make against the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationAction {
    /// Enable message registration for the app.
    Register,
    /// Disable message registration for the app.
    Unregister,
}

impl RegistrationAction {
    /// The `enabled` flag to pass to the provider.
    pub fn enabled(&self) -> bool {
        matches!(self, Self::Register)
    }
}

/// Process an event and return the new status plus the registration call to make.
///
/// This is a pure function. `InstallQueried` and `QueryFailed` always yield
/// exactly one action; `Disconnected` only drops local state and yields none.
pub fn on_event(
    status: AppStatus,
    event: AppEvent,
    connection: ConnectionStatus,
) -> (AppStatus, Option<RegistrationAction>) {
    match event {
        AppEvent::InstallQueried { installed: true } if connection.is_connected() => (
            AppStatus {
                is_installed: true,
                is_message_registered: true,
            },
            Some(RegistrationAction::Register),
        ),
        AppEvent::InstallQueried { installed } => (
            AppStatus {
                is_installed: installed,
                is_message_registered: false,
            },
            Some(RegistrationAction::Unregister),
        ),
        AppEvent::QueryFailed => (
            AppStatus {
                is_installed: false,
                is_message_registered: false,
            },
            Some(RegistrationAction::Unregister),
        ),
        AppEvent::Disconnected => (
            AppStatus {
                is_message_registered: false,
                ..status
            },
            None,
        ),
    }
}

/// Check the registration invariant for one app.
pub fn is_consistent(status: &AppStatus, connection: ConnectionStatus) -> bool {
    !status.is_message_registered || (status.is_installed && connection.is_connected())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTERED: AppStatus = AppStatus {
        is_installed: true,
        is_message_registered: true,
    };

    // ===========================================
    // Install Query Tests
    // ===========================================

    #[test]
    fn installed_and_connected_registers() {
        let (status, action) = on_event(
            AppStatus::default(),
            AppEvent::InstallQueried { installed: true },
            ConnectionStatus::Connected,
        );

        assert_eq!(status, REGISTERED);
        assert_eq!(action, Some(RegistrationAction::Register));
    }

    #[test]
    fn not_installed_unregisters() {
        let (status, action) = on_event(
            REGISTERED,
            AppEvent::InstallQueried { installed: false },
            ConnectionStatus::Connected,
        );

        assert!(!status.is_installed);
        assert!(!status.is_message_registered);
        assert_eq!(action, Some(RegistrationAction::Unregister));
    }

    #[test]
    fn installed_but_disconnected_stays_unregistered() {
        let (status, action) = on_event(
            AppStatus::default(),
            AppEvent::InstallQueried { installed: true },
            ConnectionStatus::NotConnected,
        );

        assert!(status.is_installed);
        assert!(!status.is_message_registered);
        assert_eq!(action, Some(RegistrationAction::Unregister));
    }

    #[test]
    fn query_failure_falls_back_to_not_installed() {
        let (status, action) = on_event(
            REGISTERED,
            AppEvent::QueryFailed,
            ConnectionStatus::Connected,
        );

        assert_eq!(status, AppStatus::default());
        assert_eq!(action, Some(RegistrationAction::Unregister));
    }

    // ===========================================
    // Disconnect Tests
    // ===========================================

    #[test]
    fn disconnect_drops_registration_without_provider_call() {
        let (status, action) = on_event(
            REGISTERED,
            AppEvent::Disconnected,
            ConnectionStatus::NotConnected,
        );

        assert!(status.is_installed, "install state is kept");
        assert!(!status.is_message_registered);
        assert_eq!(action, None);
    }

    #[test]
    fn every_transition_preserves_invariant() {
        let events = [
            AppEvent::InstallQueried { installed: true },
            AppEvent::InstallQueried { installed: false },
            AppEvent::QueryFailed,
            AppEvent::Disconnected,
        ];
        let connections = [
            ConnectionStatus::Invalid,
            ConnectionStatus::BluetoothUnavailable,
            ConnectionStatus::NotFound,
            ConnectionStatus::NotConnected,
            ConnectionStatus::Connected,
        ];

        for event in events {
            for connection in connections {
                // Disconnected is only ever delivered for a non-connected device
                if event == AppEvent::Disconnected && connection.is_connected() {
                    continue;
                }
                let (status, _) = on_event(REGISTERED, event, connection);
                assert!(
                    is_consistent(&status, connection),
                    "{:?} under {:?} produced {:?}",
                    event,
                    connection,
                    status
                );
            }
        }
    }

    #[test]
    fn action_enabled_flag() {
        assert!(RegistrationAction::Register.enabled());
        assert!(!RegistrationAction::Unregister.enabled());
    }
}
