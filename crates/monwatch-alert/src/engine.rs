use crate::alert::{Alert, Frame};
use crate::condition::{Run, RunKey};
use crate::config::WatchConfig;
use crate::error::{AlertError, Result};
use crate::stats::AlertStatistics;
use crate::watch::{State, Watch};
use crate::SeriesSource;
use monwatch_common::types::{Level, SeriesKey};
use monwatch_series::SeriesDataset;
use std::any::Any;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub const DEFAULT_MAX_CLOSED_ALERTS: usize = 500;

/// Key: (watch name, series key)
type OngoingKey = (String, SeriesKey);

/// A watch whose evaluation failed during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchFault {
    pub watch: String,
    pub error: AlertError,
}

/// Outcome of one evaluation tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Alerts whose level changed (created, escalated, de-escalated or closed).
    pub changed: Vec<Arc<Alert>>,
    pub faults: Vec<WatchFault>,
}

impl TickReport {
    pub fn change_count(&self) -> usize {
        self.changed.len()
    }
}

struct Transition {
    to: Level,
    cause: SeriesDataset,
    captured: Vec<SeriesDataset>,
}

/// What one tick decided for one watched (series, instance).
struct Observation {
    key: SeriesKey,
    time: i64,
    runs: Vec<(RunKey, Run)>,
    transition: Option<Transition>,
}

struct WatchObservations {
    watch: String,
    outcome: std::result::Result<Vec<Observation>, AlertError>,
}

/// Read phase of one tick, produced by [`AlertEngine::observe`] and applied
/// by [`AlertEngine::commit`].
pub struct Observations {
    revision: u64,
    watches: Vec<WatchObservations>,
}

impl Observations {
    /// Number of watches that were evaluated.
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }
}

pub struct AlertEngine {
    watches: Vec<Watch>,
    alerts: BTreeMap<u32, Arc<Alert>>,
    ongoing: HashMap<OngoingKey, u32>,
    closed: VecDeque<u32>,
    last_serial: u32,
    change_count: u64,
    max_closed_alerts: usize,
    /// Bumped by every commit and watch change; stale observations are dropped.
    revision: u64,
}

impl AlertEngine {
    pub fn new(max_closed_alerts: usize) -> Self {
        Self {
            watches: Vec::new(),
            alerts: BTreeMap::new(),
            ongoing: HashMap::new(),
            closed: VecDeque::new(),
            last_serial: 0,
            change_count: 0,
            max_closed_alerts,
            revision: 0,
        }
    }

    pub fn watches(&self) -> &[Watch] {
        &self.watches
    }

    pub fn watch(&self, name: &str) -> Option<&Watch> {
        self.watches.iter().find(|w| w.name == name)
    }

    /// Adds a watch, replacing (and closing the alerts of) a same-named one.
    pub fn add_watch(&mut self, watch: Watch, now: i64) {
        self.revision += 1;
        match self.watches.iter().position(|w| w.name == watch.name) {
            Some(index) => {
                self.close_alerts_of(&watch.name, now);
                tracing::info!(watch = %watch.name, series = %watch.watched.series, "Watch replaced");
                self.watches[index] = watch;
            }
            None => {
                tracing::info!(watch = %watch.name, series = %watch.watched.series, "Watch added");
                if watch.is_inert() {
                    tracing::debug!(watch = %watch.name, "Watch has no circumstance and stays inert");
                }
                self.watches.push(watch);
            }
        }
    }

    /// Validates and adds a configured watch. An invalid config leaves the
    /// engine untouched.
    pub fn register(&mut self, config: &WatchConfig, now: i64) -> Result<()> {
        let watch = Watch::from_config(config).inspect_err(|e| {
            tracing::warn!(watch = %config.name, error = %e, "Watch config rejected");
        })?;
        self.add_watch(watch, now);
        Ok(())
    }

    /// Replaces all watches with a new set.
    pub fn replace_watches(&mut self, watches: Vec<Watch>, now: i64) {
        self.revision += 1;
        let names: Vec<String> = self.watches.iter().map(|w| w.name.clone()).collect();
        for name in names {
            self.close_alerts_of(&name, now);
        }
        self.watches = watches;
        tracing::info!(watch_count = self.watches.len(), "Watches replaced");
    }

    pub fn remove_watch(&mut self, name: &str, now: i64) -> Result<Watch> {
        let index = self.index_of(name)?;
        self.revision += 1;
        self.close_alerts_of(name, now);
        tracing::info!(watch = %name, "Watch removed");
        Ok(self.watches.remove(index))
    }

    /// Stops a watch. Its ongoing alerts are closed and its states reset.
    pub fn stop_watch(&mut self, name: &str, now: i64) -> Result<()> {
        let index = self.index_of(name)?;
        self.revision += 1;
        self.watches[index].set_stopped(true);
        self.watches[index].clear_states();
        self.close_alerts_of(name, now);
        tracing::info!(watch = %name, "Watch stopped");
        Ok(())
    }

    pub fn resume_watch(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        self.revision += 1;
        self.watches[index].set_stopped(false);
        tracing::info!(watch = %name, "Watch resumed");
        Ok(())
    }

    /// Disables a watch. Its ongoing alerts are closed and its states reset.
    pub fn disable_watch(&mut self, name: &str, now: i64) -> Result<()> {
        let index = self.index_of(name)?;
        self.revision += 1;
        self.watches[index].set_disabled(true);
        self.watches[index].clear_states();
        self.close_alerts_of(name, now);
        tracing::info!(watch = %name, "Watch disabled");
        Ok(())
    }

    pub fn enable_watch(&mut self, name: &str) -> Result<()> {
        let index = self.index_of(name)?;
        self.revision += 1;
        self.watches[index].set_disabled(false);
        tracing::info!(watch = %name, "Watch enabled");
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.watches
            .iter()
            .position(|w| w.name == name)
            .ok_or_else(|| AlertError::UnknownWatch(name.to_string()))
    }

    /// Runs one evaluation pass over every active watch and every
    /// (series, instance) it matches.
    ///
    /// A failing watch is reported in [`TickReport::faults`] and does not
    /// keep the remaining watches from being evaluated.
    pub fn evaluate(&mut self, source: &dyn SeriesSource) -> TickReport {
        let observations = self.observe(source);
        self.commit(observations)
    }

    /// Read phase of a tick: decides every transition without changing the
    /// engine, so it only needs shared access.
    pub fn observe(&self, source: &dyn SeriesSource) -> Observations {
        let watches = self
            .watches
            .iter()
            .filter(|watch| watch.is_active())
            .map(|watch| {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| observe_watch(watch, source)))
                    .map_err(|payload| AlertError::Evaluation {
                        watch: watch.name.clone(),
                        reason: panic_message(payload.as_ref()),
                    });
                WatchObservations {
                    watch: watch.name.clone(),
                    outcome,
                }
            })
            .collect();
        Observations {
            revision: self.revision,
            watches,
        }
    }

    /// Write phase of a tick: applies observations taken by
    /// [`observe`](Self::observe).
    ///
    /// Observations taken before another commit or a watch change are
    /// dropped, since they were decided from states that no longer hold.
    pub fn commit(&mut self, observations: Observations) -> TickReport {
        let mut report = TickReport::default();
        if observations.revision != self.revision {
            tracing::debug!(
                observed = observations.revision,
                current = self.revision,
                "Dropping stale observations"
            );
            return report;
        }
        self.revision += 1;

        for WatchObservations { watch: name, outcome } in observations.watches {
            let outcome = outcome.and_then(|observed| {
                let index = self.index_of(&name)?;
                Ok((index, observed))
            });
            let (index, observed) = match outcome {
                Ok(found) => found,
                Err(error) => {
                    tracing::warn!(watch = %name, error = %error, "Watch evaluation failed");
                    report.faults.push(WatchFault { watch: name, error });
                    continue;
                }
            };

            for observation in observed {
                match self.apply(index, observation) {
                    Ok(Some(alert)) => report.changed.push(alert),
                    Ok(None) => {}
                    Err(error) => {
                        tracing::warn!(watch = %name, error = %error, "Watch evaluation failed");
                        report.faults.push(WatchFault {
                            watch: name.clone(),
                            error,
                        });
                        break;
                    }
                }
            }
        }

        if !report.changed.is_empty() {
            tracing::debug!(changed = report.changed.len(), "Evaluation tick changed alerts");
        }
        report
    }

    fn apply(&mut self, index: usize, observation: Observation) -> Result<Option<Arc<Alert>>> {
        let Observation {
            key,
            time,
            runs,
            transition,
        } = observation;
        let watch = &mut self.watches[index];
        watch.record_runs(runs);
        let Some(Transition { to, cause, captured }) = transition else {
            if watch.state(&key).is_none() {
                watch.set_state(
                    key,
                    State {
                        level: Level::Green,
                        since: time,
                    },
                );
            }
            return Ok(None);
        };
        let watch_name = watch.name.clone();
        let ongoing_key = (watch_name.clone(), key.clone());

        let changed = if to == Level::Green {
            match self.ongoing.remove(&ongoing_key) {
                Some(serial) => {
                    let alert = self.published(serial)?;
                    Arc::make_mut(alert).close(time);
                    let alert = Arc::clone(alert);
                    self.closed.push_back(serial);
                    tracing::info!(
                        serial,
                        watch = %watch_name,
                        key = %key,
                        "Alert closed"
                    );
                    Some(alert)
                }
                None => None,
            }
        } else if let Some(&serial) = self.ongoing.get(&ongoing_key) {
            let alert = self.published(serial)?;
            Arc::make_mut(alert).transition(Frame::new(to, time, cause, captured));
            tracing::debug!(serial, watch = %watch_name, key = %key, level = %to, "Alert level changed");
            Some(Arc::clone(alert))
        } else {
            let serial = self.next_serial()?;
            let frame = Frame::new(to, time, cause, captured);
            let alert = Arc::new(Alert::open(serial, watch_name.clone(), key.clone(), frame));
            self.alerts.insert(serial, Arc::clone(&alert));
            self.ongoing.insert(ongoing_key, serial);
            tracing::info!(serial, watch = %watch_name, key = %key, level = %to, "Alert raised");
            Some(alert)
        };

        self.watches[index].set_state(key, State { level: to, since: time });
        self.change_count += 1;
        self.evict_closed();
        Ok(changed)
    }

    fn published(&mut self, serial: u32) -> Result<&mut Arc<Alert>> {
        self.alerts
            .get_mut(&serial)
            .ok_or(AlertError::UnknownAlert(serial))
    }

    fn next_serial(&mut self) -> Result<u32> {
        let serial = self
            .last_serial
            .checked_add(1)
            .ok_or(AlertError::SerialExhausted)?;
        self.last_serial = serial;
        Ok(serial)
    }

    fn close_alerts_of(&mut self, watch: &str, now: i64) {
        let keys: Vec<OngoingKey> = self
            .ongoing
            .keys()
            .filter(|(name, _)| name == watch)
            .cloned()
            .collect();
        for key in keys {
            let Some(serial) = self.ongoing.remove(&key) else {
                continue;
            };
            if let Some(alert) = self.alerts.get_mut(&serial) {
                Arc::make_mut(alert).stop(now);
                self.closed.push_back(serial);
                self.change_count += 1;
                tracing::info!(serial, watch, key = %key.1, "Alert stopped with its watch");
            }
        }
        self.evict_closed();
    }

    fn evict_closed(&mut self) {
        while self.closed.len() > self.max_closed_alerts {
            if let Some(serial) = self.closed.pop_front() {
                self.alerts.remove(&serial);
            }
        }
    }

    /// Marks an alert as acknowledged. Returns true when the flag changed.
    /// Never reopens a closed alert.
    pub fn acknowledge(&mut self, serial: u32) -> Result<bool> {
        let alert = self.published(serial)?;
        let changed = Arc::make_mut(alert).acknowledge();
        if changed {
            tracing::info!(serial, "Alert acknowledged");
        }
        Ok(changed)
    }

    pub fn alert(&self, serial: u32) -> Option<Arc<Alert>> {
        self.alerts.get(&serial).cloned()
    }

    /// All retained alerts ordered by serial.
    pub fn alerts(&self) -> Vec<Arc<Alert>> {
        self.alerts.values().cloned().collect()
    }

    pub fn ongoing_alerts(&self) -> Vec<Arc<Alert>> {
        self.alerts
            .values()
            .filter(|a| a.is_ongoing())
            .cloned()
            .collect()
    }

    pub fn alerts_for(&self, series: &str, instance: &str) -> Vec<Arc<Alert>> {
        self.alerts
            .values()
            .filter(|a| a.series() == series && a.instance() == instance)
            .cloned()
            .collect()
    }

    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    pub fn statistics(&self) -> AlertStatistics {
        AlertStatistics::compute(
            self.watches.len(),
            self.change_count,
            self.alerts.values().map(|a| a.as_ref()),
        )
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLOSED_ALERTS)
    }
}

/// Read-only pass over the data a watch references.
fn observe_watch(watch: &Watch, source: &dyn SeriesSource) -> Vec<Observation> {
    let mut observed = Vec::new();
    for key in source.keys_matching(&watch.watched.series) {
        let Some(data) = source.snapshot(&key.series, &key.instance) else {
            continue;
        };
        let Some(time) = data.last_time() else {
            continue;
        };
        let current = watch.level(&key);
        let step = watch.step(current, &data, source);
        let transition = (step.level != current).then(|| {
            tracing::debug!(watch = %watch.name, key = %key, from = %current, to = %step.level, "Level transition");
            let captured = watch
                .captures
                .iter()
                .filter_map(|series| source.snapshot(series, &key.instance))
                .collect();
            Transition {
                to: step.level,
                cause: data,
                captured,
            }
        });
        observed.push(Observation {
            key,
            time,
            runs: step.runs,
            transition,
        });
    }
    observed
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during evaluation".to_string()
    }
}
