use anyhow::{Context, Result};
use monwatch_alert::config::{parse_watch_configs, WatchConfig};
use monwatch_alert::engine::AlertEngine;
use monwatch_alert::watch::Watch;
use std::collections::HashSet;
use std::sync::RwLock;

pub fn load_watch_configs(path: &str) -> Result<Vec<WatchConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read watches file '{path}'"))?;
    parse_watch_configs(&content).with_context(|| format!("Failed to parse watches file '{path}'"))
}

/// Converts configs into watches, skipping the ones that fail validation.
/// Names must be unique; the first config with a name wins.
pub fn build_watches(configs: &[WatchConfig]) -> Vec<Watch> {
    let mut watches = Vec::with_capacity(configs.len());
    let mut names = HashSet::new();
    for config in configs {
        match Watch::from_config(config) {
            Ok(watch) if !names.insert(watch.name.clone()) => {
                tracing::warn!(watch = %watch.name, "Skipping duplicate watch name");
            }
            Ok(watch) => watches.push(watch),
            Err(e) => {
                tracing::warn!(
                    watch = %config.name,
                    series = %config.series,
                    error = %e,
                    "Skipping invalid watch"
                );
            }
        }
    }
    watches
}

/// Reloads all watches from `path`. Returns the number of loaded watches.
pub fn reload_alert_engine(path: &str, alert_engine: &RwLock<AlertEngine>, now: i64) -> Result<usize> {
    let configs = load_watch_configs(path)?;
    let watches = build_watches(&configs);
    let count = watches.len();

    let mut engine = alert_engine
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    engine.replace_watches(watches, now);

    tracing::info!(watch_count = count, skipped = configs.len() - count, path, "Watches loaded");
    Ok(count)
}
