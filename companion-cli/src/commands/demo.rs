//! Run the engine end to end against the mock provider.
//!
//! Two devices are discovered: one connected with both companion apps
//! installed, one out of range. The watch face then asks for data, and the
//! demo waits for both delivery attempts before printing what was sent.

use anyhow::{Context, Result};
use companion_core::{DATA_FIELD_APP_ID, WATCH_FACE_APP_ID};
use companion_engine::{
    DeviceRegistry, DeviceStore, EngineConfig, MockProvider, ProviderEvent, RegistryHandle,
    RegistryNotification, StaticReadings,
};
use companion_types::{ConnectionStatus, Device, DeviceId, GlucoseReading};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// What the demo observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoOutcome {
    /// Devices known after discovery.
    pub devices: usize,
    /// Send attempts seen by the mock provider.
    pub sends: usize,
}

/// Run the demo command.
pub async fn run(config: EngineConfig) -> Result<()> {
    let outcome = execute(config).await?;
    println!();
    println!(
        "Demo finished: {} devices, {} send attempts.",
        outcome.devices, outcome.sends
    );
    Ok(())
}

/// Drive one discovery / request / delivery cycle.
pub async fn execute(config: EngineConfig) -> Result<DemoOutcome> {
    // Keep demo devices out of the real device list
    let store_path = config
        .storage
        .store()
        .context("Failed to locate device store")?
        .path()
        .with_file_name("demo-devices.json");
    let store = DeviceStore::new(store_path);

    let connected = DeviceId::new("demo-fr265");
    let away = DeviceId::new("demo-fenix7");
    let provider = MockProvider::new();
    provider.set_status(&connected, ConnectionStatus::Connected);
    provider.set_status(&away, ConnectionStatus::NotFound);
    provider.set_installed(&connected, &WATCH_FACE_APP_ID, true);
    provider.set_installed(&connected, &DATA_FIELD_APP_ID, true);
    provider.queue_discovery(vec![
        Device::new(connected.clone(), "Forerunner", "Forerunner 265"),
        Device::new(away, "Fenix", "fenix 7"),
    ]);

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    let readings = StaticReadings::new(vec![
        GlucoseReading::new(120, 4, now_ms, "demo"),
        GlucoseReading::new(110, 4, now_ms - 5 * 60 * 1000, "demo"),
    ]);

    let settle = config.sync.settle_delay();
    let repeat = Duration::from_secs(config.sync.repeat_delay_secs);
    let registry = DeviceRegistry::new(
        config,
        store,
        Arc::new(provider.clone()),
        Arc::new(readings),
    );
    let (handle, task) = RegistryHandle::spawn(registry);
    provider.set_event_sink(handle.provider_events());

    let mut notifications = handle.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            match notification {
                RegistryNotification::DevicesChanged => println!("* device list changed"),
                RegistryNotification::DeviceStatusChanged { device_id, status } => {
                    println!("* {} is now {}", device_id, status)
                }
            }
        }
    });

    println!("Discovering devices...");
    handle.discover().await.context("Discovery failed")?;
    tokio::time::sleep(settle).await;

    for snapshot in handle.devices().await? {
        println!(
            "{} ({}): {}",
            snapshot.device.display_name, snapshot.device.model_name, snapshot.status
        );
        for app in snapshot.apps {
            println!(
                "  {}: installed={} registered={}",
                app.app.display_name, app.status.is_installed, app.status.is_message_registered
            );
        }
    }

    println!();
    println!("Watch face requests data...");
    provider.emit(ProviderEvent::MessageReceived {
        device_id: connected,
        app_id: WATCH_FACE_APP_ID,
        command: "getData".into(),
    });
    tokio::time::sleep(repeat + Duration::from_secs(1)).await;

    let sent = provider.sent_messages();
    let first = sent.first().map(|m| m.at);
    for message in &sent {
        let offset = first
            .map(|start| message.at.duration_since(start))
            .unwrap_or_default();
        println!(
            "+{:>5} ms  app {} on {}: {}",
            offset.as_millis(),
            message.app_id,
            message.device_id,
            message.payload.to_json().unwrap_or_default()
        );
    }

    let devices = handle.devices().await?.len();
    handle.shutdown().await?;
    task.await.context("Registry task failed")?;
    printer.abort();

    Ok(DemoOutcome {
        devices,
        sends: sent.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(start_paused = true)]
    async fn demo_sends_twice_to_both_apps() {
        let dir = tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());

        let outcome = execute(config).await.unwrap();

        assert_eq!(outcome.devices, 2);
        assert_eq!(outcome.sends, 4);
        assert!(dir.path().join("demo-devices.json").exists());
        assert!(!dir.path().join("devices.json").exists());
    }
}
