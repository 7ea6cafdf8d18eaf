//! Watch evaluation and alert lifecycle.
//!
//! A [`watch::Watch`] names a series (or glob pattern) and up to three
//! circumstances (red, amber, green). On every tick the
//! [`engine::AlertEngine`] moves each watched (series, instance) through the
//! GREEN / AMBER / RED state machine and records every excursion from GREEN as
//! an [`alert::Alert`] made of level frames.

pub mod alert;
pub mod circumstance;
pub mod condition;
pub mod config;
pub mod engine;
pub mod error;
pub mod stats;
pub mod watch;


use monwatch_common::types::SeriesKey;
use monwatch_series::{SeriesDataset, SeriesStore};

pub use engine::{AlertEngine, Observations, TickReport, WatchFault};
pub use error::{AlertError, Result};

/// Read access to series data during evaluation.
///
/// The engine never mutates series through this trait; every dataset it
/// hands out is a snapshot detached from later ingestion.
pub trait SeriesSource: Send + Sync {
    /// Keys whose series name matches `pattern` (a name or glob).
    fn keys_matching(&self, pattern: &str) -> Vec<SeriesKey>;

    /// Snapshot of one (series, instance), or `None` if nothing was ingested.
    fn snapshot(&self, series: &str, instance: &str) -> Option<SeriesDataset>;
}

impl SeriesSource for SeriesStore {
    fn keys_matching(&self, pattern: &str) -> Vec<SeriesKey> {
        SeriesStore::keys_matching(self, pattern)
    }

    fn snapshot(&self, series: &str, instance: &str) -> Option<SeriesDataset> {
        self.get(series, instance)
    }
}
