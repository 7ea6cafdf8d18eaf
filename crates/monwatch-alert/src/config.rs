//! Serde shapes of watch configuration as edited by users or loaded from files.
//!
//! These are plain data; [`crate::watch::Watch::from_config`] validates them.

use monwatch_common::types::{Comparison, Unit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub operator: Comparison,
    pub threshold: i64,
    /// Number of consecutive qualifying samples required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_times: Option<u32>,
    /// Minimum qualifying duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_millis: Option<i64>,
    #[serde(default)]
    pub on_average: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircumstanceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<ConditionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<ConditionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress: Option<ConditionConfig>,
    /// Series whose `suppress` condition silences this circumstance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppressing_series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppressing_unit: Option<Unit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    pub name: String,
    /// Series name or glob pattern.
    pub series: String,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red: Option<CircumstanceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amber: Option<CircumstanceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub green: Option<CircumstanceConfig>,
    /// Series snapshotted alongside the cause whenever a frame opens.
    #[serde(default)]
    pub captures: Vec<String>,
    #[serde(default)]
    pub stopped: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub programmatic: bool,
}

/// Parses a JSON array of watch configurations.
pub fn parse_watch_configs(json: &str) -> serde_json::Result<Vec<WatchConfig>> {
    serde_json::from_str(json)
}
