use crate::error::{Result, SeriesError};
use serde::{Deserialize, Serialize};

/// Capacities of the raw ring buffer and the three rollup tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Raw points kept per (series, instance).
    #[serde(default = "default_raw_capacity")]
    pub raw_capacity: usize,
    #[serde(default = "default_minute_buckets")]
    pub minute_buckets: usize,
    #[serde(default = "default_hour_buckets")]
    pub hour_buckets: usize,
    #[serde(default = "default_day_buckets")]
    pub day_buckets: usize,
    /// Non-permanent annotations kept per (series, instance).
    #[serde(default = "default_annotation_capacity")]
    pub annotation_capacity: usize,
}

fn default_raw_capacity() -> usize {
    120
}

fn default_minute_buckets() -> usize {
    60
}

fn default_hour_buckets() -> usize {
    24
}

fn default_day_buckets() -> usize {
    30
}

fn default_annotation_capacity() -> usize {
    32
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            raw_capacity: default_raw_capacity(),
            minute_buckets: default_minute_buckets(),
            hour_buckets: default_hour_buckets(),
            day_buckets: default_day_buckets(),
            annotation_capacity: default_annotation_capacity(),
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("raw_capacity", self.raw_capacity),
            ("minute_buckets", self.minute_buckets),
            ("hour_buckets", self.hour_buckets),
            ("day_buckets", self.day_buckets),
            ("annotation_capacity", self.annotation_capacity),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(SeriesError::InvalidRetention(format!(
                    "{name} must be at least 1"
                )));
            }
        }
        Ok(())
    }
}
