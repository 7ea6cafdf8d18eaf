use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use monwatch_alert::alert::Alert;
use monwatch_alert::engine::{AlertEngine, TickReport};
use monwatch_alert::stats::AlertStatistics;
use monwatch_series::{SeriesDataset, SeriesStore};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Series store and alert engine shared between ingestion, the scheduler
/// and readers.
#[derive(Clone)]
pub struct Monitor {
    pub store: Arc<SeriesStore>,
    pub alert_engine: Arc<RwLock<AlertEngine>>,
    pub start_time: DateTime<Utc>,
}

impl Monitor {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let store = SeriesStore::new(config.retention.clone())?;
        Ok(Self {
            store: Arc::new(store),
            alert_engine: Arc::new(RwLock::new(AlertEngine::new(config.max_closed_alerts))),
            start_time: Utc::now(),
        })
    }

    /// Records one sample. Out-of-order samples are rejected, never reordered.
    pub fn ingest(
        &self,
        series: &str,
        instance: &str,
        time: i64,
        value: i64,
    ) -> monwatch_series::Result<()> {
        self.store.ingest(series, instance, time, value)
    }

    /// Runs one evaluation pass. Watches are evaluated under the read lock,
    /// so readers are only held up while the results are applied.
    pub fn tick(&self) -> TickReport {
        let observations = self.engine().observe(self.store.as_ref());
        self.engine_mut().commit(observations)
    }

    pub fn dataset(&self, series: &str, instance: &str) -> Option<SeriesDataset> {
        self.store.get(series, instance)
    }

    pub fn alerts(&self) -> Vec<Arc<Alert>> {
        self.engine().alerts()
    }

    pub fn ongoing_alerts(&self) -> Vec<Arc<Alert>> {
        self.engine().ongoing_alerts()
    }

    pub fn acknowledge(&self, serial: u32) -> monwatch_alert::Result<bool> {
        self.engine_mut().acknowledge(serial)
    }

    pub fn statistics(&self) -> AlertStatistics {
        self.engine().statistics()
    }

    pub fn engine(&self) -> RwLockReadGuard<'_, AlertEngine> {
        self.alert_engine
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn engine_mut(&self) -> RwLockWriteGuard<'_, AlertEngine> {
        self.alert_engine
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
