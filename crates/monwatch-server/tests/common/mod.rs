#![allow(dead_code)]

use anyhow::Result;
use monwatch_server::config::ServerConfig;
use monwatch_server::state::Monitor;
use monwatch_server::watch_loader;
use std::path::Path;
use tempfile::TempDir;

pub const WATCHES_JSON: &str = r#"[
    {
        "name": "cpu-high",
        "series": "cpu",
        "unit": "percent",
        "red": {"start": {"operator": ">", "threshold": 90, "for_times": 3}},
        "captures": ["mem"]
    },
    {
        "name": "disk-full",
        "series": "disk.*",
        "unit": "percent",
        "red": {
            "start": {"operator": ">=", "threshold": 95},
            "suppress": {"operator": "==", "threshold": 1},
            "suppressing_series": "maintenance"
        },
        "amber": {"start": {"operator": ">=", "threshold": 80}}
    },
    {
        "name": "broken",
        "series": "cpu",
        "red": {"start": {"operator": ">", "threshold": 1, "for_times": 2, "for_millis": 10}}
    }
]"#;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub config: ServerConfig,
    pub monitor: Monitor,
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> Result<String> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path.to_string_lossy().into_owned())
}

/// Writes a config plus the standard watches file and builds a monitor from it.
pub fn build_test_context() -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let watches_path = write_file(temp_dir.path(), "watches.json", WATCHES_JSON)?;
    let config_toml = format!(
        "tick_interval_secs = 1\nwatches_file = {watches_path:?}\nmax_closed_alerts = 10\n\n[retention]\nraw_capacity = 16\n"
    );
    let config_path = write_file(temp_dir.path(), "server.toml", &config_toml)?;

    let config = ServerConfig::load(&config_path)?;
    let monitor = Monitor::new(&config)?;
    if let Some(path) = &config.watches_file {
        watch_loader::reload_alert_engine(path, &monitor.alert_engine, 0)?;
    }
    Ok(TestContext {
        temp_dir,
        config,
        monitor,
    })
}
