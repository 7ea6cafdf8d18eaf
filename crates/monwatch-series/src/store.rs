use crate::annotation::{Annotation, AnnotationLog};
use crate::config::RetentionConfig;
use crate::dataset::SeriesDataset;
use crate::error::Result;
use monwatch_common::pattern::series_matches;
use monwatch_common::types::{Point, SeriesKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Entry = Arc<Mutex<SeriesDataset>>;

/// Registry of all series datasets, keyed by (series, instance).
///
/// Each dataset sits behind its own lock, so collectors reporting for
/// different instances never contend with each other. The outer map lock is
/// only taken for writing when a key is seen for the first time. Reads hand
/// out cloned snapshots taken under the dataset lock.
pub struct SeriesStore {
    config: RetentionConfig,
    datasets: RwLock<HashMap<SeriesKey, Entry>>,
    annotations: RwLock<HashMap<SeriesKey, AnnotationLog>>,
}

impl SeriesStore {
    pub fn new(config: RetentionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            datasets: RwLock::new(HashMap::new()),
            annotations: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Records one measurement, creating the dataset on first use.
    pub fn ingest(&self, series: &str, instance: &str, time: i64, value: i64) -> Result<()> {
        let entry = self.entry(SeriesKey::new(series, instance));
        let mut dataset = lock_dataset(&entry);
        dataset.add(Point::new(time, value)).inspect_err(|e| {
            tracing::debug!(series, instance, time, error = %e, "Sample rejected");
        })
    }

    fn entry(&self, key: SeriesKey) -> Entry {
        if let Some(entry) = self.read_map().get(&key) {
            return Arc::clone(entry);
        }
        let mut map = self.write_map();
        let entry = map.entry(key).or_insert_with_key(|key| {
            tracing::debug!(key = %key, "New series dataset");
            Arc::new(Mutex::new(SeriesDataset::new(key.clone(), &self.config)))
        });
        Arc::clone(entry)
    }

    /// Snapshot of one dataset; `None` before its first point arrived.
    pub fn get(&self, series: &str, instance: &str) -> Option<SeriesDataset> {
        let entry = self
            .read_map()
            .get(&SeriesKey::new(series, instance))
            .map(Arc::clone)?;
        let snapshot = lock_dataset(&entry).clone();
        Some(snapshot)
    }

    /// Snapshots of every dataset whose series name matches `pattern`,
    /// ordered by (series, instance).
    pub fn query(&self, pattern: &str) -> Vec<SeriesDataset> {
        let mut entries: Vec<(SeriesKey, Entry)> = self
            .read_map()
            .iter()
            .filter(|(key, _)| series_matches(pattern, &key.series))
            .map(|(key, entry)| (key.clone(), Arc::clone(entry)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
            .into_iter()
            .map(|(_, entry)| {
                let snapshot = lock_dataset(&entry).clone();
                snapshot
            })
            .collect()
    }

    /// Keys whose series name matches `pattern`, ordered.
    pub fn keys_matching(&self, pattern: &str) -> Vec<SeriesKey> {
        let mut keys: Vec<SeriesKey> = self
            .read_map()
            .keys()
            .filter(|key| series_matches(pattern, &key.series))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Instances that have reported `series`, ordered.
    pub fn instances(&self, series: &str) -> Vec<String> {
        let mut instances: Vec<String> = self
            .read_map()
            .keys()
            .filter(|key| key.series == series)
            .map(|key| key.instance.clone())
            .collect();
        instances.sort();
        instances
    }

    /// Distinct series names, ordered.
    pub fn series_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_map().keys().map(|k| k.series.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Attaches an annotation to its (series, instance). Transient
    /// annotations beyond `annotation_capacity` evict the oldest one.
    pub fn annotate(&self, annotation: Annotation) {
        let mut logs = self
            .annotations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tracing::debug!(key = %annotation.key, time = annotation.time, "Annotation added");
        logs.entry(annotation.key.clone())
            .or_insert_with(|| AnnotationLog::new(self.config.annotation_capacity))
            .add(annotation);
    }

    /// Annotations of one (series, instance) ordered by time; empty when
    /// nothing was annotated.
    pub fn annotations(&self, series: &str, instance: &str) -> Vec<Annotation> {
        self.read_annotations()
            .get(&SeriesKey::new(series, instance))
            .map(AnnotationLog::annotations)
            .unwrap_or_default()
    }

    /// Annotations of every (series, instance) whose series matches
    /// `pattern`, grouped by key in key order.
    pub fn annotations_matching(&self, pattern: &str) -> Vec<Annotation> {
        let logs = self.read_annotations();
        let mut keys: Vec<&SeriesKey> = logs
            .keys()
            .filter(|key| series_matches(pattern, &key.series))
            .collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| logs.get(key))
            .flat_map(AnnotationLog::annotations)
            .collect()
    }

    fn read_annotations(&self) -> RwLockReadGuard<'_, HashMap<SeriesKey, AnnotationLog>> {
        self.annotations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    /// Lock the map, recovering from a poisoned lock if necessary.
    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<SeriesKey, Entry>> {
        self.datasets
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<SeriesKey, Entry>> {
        self.datasets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SeriesStore {
    fn default() -> Self {
        Self {
            config: RetentionConfig::default(),
            datasets: RwLock::new(HashMap::new()),
            annotations: RwLock::new(HashMap::new()),
        }
    }
}

fn lock_dataset(entry: &Mutex<SeriesDataset>) -> MutexGuard<'_, SeriesDataset> {
    entry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
