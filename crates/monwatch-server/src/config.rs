use anyhow::Context;
use monwatch_series::RetentionConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Seconds between two evaluation passes over all watches.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// JSON file holding a list of watch configurations.
    #[serde(default)]
    pub watches_file: Option<String>,
    /// `tracing` filter directives; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Closed alerts kept for listing before the oldest are dropped.
    #[serde(default = "default_max_closed_alerts")]
    pub max_closed_alerts: usize,
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            watches_file: None,
            log_filter: None,
            max_closed_alerts: default_max_closed_alerts(),
            retention: RetentionConfig::default(),
        }
    }
}

fn default_tick_interval_secs() -> u64 {
    5
}

fn default_max_closed_alerts() -> usize {
    monwatch_alert::engine::DEFAULT_MAX_CLOSED_ALERTS
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file '{path}'"))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.tick_interval_secs == 0 {
            anyhow::bail!("tick_interval_secs must be at least 1");
        }
        config.retention.validate()?;
        Ok(config)
    }
}
