//! Show effective configuration and persisted devices.

use anyhow::{Context, Result};
use companion_engine::EngineConfig;

/// Run the status command.
pub fn run(config: &EngineConfig) -> Result<()> {
    println!("=== companion-cli status ===");
    println!();

    println!("Sync:");
    println!("  Enabled:      {}", config.sync.enabled);
    println!("  Settle delay: {} ms", config.sync.settle_delay_ms);
    println!("  Repeat delay: {} s", config.sync.repeat_delay_secs);
    println!(
        "  Readings:     {} from the last {} minutes",
        config.sync.reading_limit, config.sync.lookback_minutes
    );
    println!();

    println!("Companion apps:");
    for app in config.apps.apps() {
        println!("  {} ({})", app.display_name, app.app_id);
    }
    println!();

    let store = config
        .storage
        .store()
        .context("Failed to locate device store")?;
    println!("Device store: {}", store.path().display());

    match store.load() {
        Ok(devices) if devices.is_empty() => println!("  No devices"),
        Ok(devices) => {
            for device in devices {
                println!(
                    "  {} - {} [{}]",
                    device.display_name, device.model_name, device.id
                );
            }
        }
        Err(e) => {
            println!("  No devices ({})", e);
        }
    }

    Ok(())
}
