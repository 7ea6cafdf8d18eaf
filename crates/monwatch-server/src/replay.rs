//! Offline evaluation of watches against a recorded sample feed.
//!
//! A feed is plain text, one `series,instance,timestamp_millis,value` sample
//! per line. Blank lines and lines starting with `#` are ignored. Samples are
//! replayed in file order and watches are evaluated each time the timestamp
//! advances, so samples sharing a timestamp are seen by the same tick.

use crate::state::Monitor;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat};
use monwatch_alert::alert::Alert;
use monwatch_alert::stats::AlertStatistics;
use std::fmt::Write;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSample {
    pub series: String,
    pub instance: String,
    pub time: i64,
    pub value: i64,
}

pub fn parse_feed(content: &str) -> Result<Vec<FeedSample>> {
    let mut samples = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if let Some(sample) = parse_sample(line).with_context(|| format!("feed line {}", index + 1))? {
            samples.push(sample);
        }
    }
    Ok(samples)
}

/// Parses one feed line. Blank and comment lines yield `None`.
pub fn parse_sample(line: &str) -> Result<Option<FeedSample>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [series, instance, time, value] = fields.as_slice() else {
        bail!("expected 4 fields (series,instance,timestamp,value), got {}", fields.len());
    };
    if series.is_empty() || instance.is_empty() {
        bail!("series and instance must not be empty");
    }
    Ok(Some(FeedSample {
        series: series.to_string(),
        instance: instance.to_string(),
        time: time
            .parse()
            .with_context(|| format!("invalid timestamp '{time}'"))?,
        value: value
            .parse()
            .with_context(|| format!("invalid value '{value}'"))?,
    }))
}

/// Records one line of a live feed. Malformed lines and samples refused by
/// the store are logged with their line number. Returns true when a sample
/// was recorded.
pub fn ingest_line(monitor: &Monitor, line_number: usize, line: &str) -> bool {
    match parse_sample(line) {
        Ok(Some(sample)) => {
            match monitor.ingest(&sample.series, &sample.instance, sample.time, sample.value) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(line = line_number, error = %e, "Sample rejected");
                    false
                }
            }
        }
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(line = line_number, error = %e, "Skipping malformed sample");
            false
        }
    }
}

#[derive(Debug)]
pub struct ReplaySummary {
    pub samples: usize,
    /// Samples refused by the store (out of order).
    pub rejected: usize,
    pub ticks: usize,
    pub faults: usize,
    /// Every alert produced, ordered by serial.
    pub alerts: Vec<Arc<Alert>>,
    pub statistics: AlertStatistics,
}

pub fn replay(monitor: &Monitor, samples: &[FeedSample]) -> ReplaySummary {
    let mut rejected = 0;
    let mut ticks = 0;
    let mut faults = 0;

    for (index, sample) in samples.iter().enumerate() {
        if let Err(e) = monitor.ingest(&sample.series, &sample.instance, sample.time, sample.value) {
            tracing::warn!(sample = index, error = %e, "Replay sample rejected");
            rejected += 1;
        }
        let step_done = samples
            .get(index + 1)
            .map_or(true, |next| next.time != sample.time);
        if step_done {
            let report = monitor.tick();
            ticks += 1;
            faults += report.faults.len();
        }
    }

    tracing::info!(samples = samples.len(), rejected, ticks, faults, "Replay finished");
    ReplaySummary {
        samples: samples.len(),
        rejected,
        ticks,
        faults,
        alerts: monitor.alerts(),
        statistics: monitor.statistics(),
    }
}

fn format_time(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

/// One-line summary of an alert and its frames.
pub fn describe(alert: &Alert) -> String {
    let mut line = format!(
        "#{} {} {} {} from {}",
        alert.serial(),
        alert.watch(),
        alert.key(),
        alert.level(),
        format_time(alert.start_time())
    );
    match alert.end_time() {
        Some(end) => {
            let _ = write!(line, " to {}", format_time(end));
        }
        None => line.push_str(" (ongoing)"),
    }
    if alert.is_stopped() {
        line.push_str(" [stopped]");
    }
    let levels: Vec<String> = alert.frames().iter().map(|f| f.level.to_string()).collect();
    let _ = write!(line, " frames=[{}]", levels.join(" -> "));
    line
}
