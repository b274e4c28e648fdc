//! Clear the persisted device list.

use anyhow::{Context, Result};
use companion_engine::EngineConfig;

/// Run the forget command.
pub fn run(config: &EngineConfig) -> Result<()> {
    let store = config
        .storage
        .store()
        .context("Failed to locate device store")?;

    let known = store.load().map(|devices| devices.len()).unwrap_or(0);
    store
        .save(&[])
        .with_context(|| format!("Failed to write {}", store.path().display()))?;

    tracing::info!("Cleared device list at {}", store.path().display());
    println!("Forgot {} devices.", known);
    Ok(())
}
