//! Config command - show or persist the effective settings.

use anyhow::{Context, Result};
use portman_core::{Config, ConfigStore};
use tracing::info;

pub fn show(store: &ConfigStore, config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("Config file:      {}", store.path().display());
    println!("Refresh interval: {}s", config.refresh_interval);
    println!("Tick interval:    {}ms", config.tick_interval_ms);
    println!("Status duration:  {}ms", config.status_duration_ms);
    println!("Kill timeout:     {}ms", config.kill_timeout_ms);
    println!("Hide borders:     {}", config.hide_borders);
    Ok(())
}

/// Write `config` to the store's file.
pub async fn save(store: &ConfigStore, config: &Config) -> Result<()> {
    store
        .save(config)
        .await
        .with_context(|| format!("Failed to write {}", store.path().display()))?;
    info!(path = %store.path().display(), "Saved configuration");
    Ok(())
}
