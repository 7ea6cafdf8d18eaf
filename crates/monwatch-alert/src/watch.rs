use crate::circumstance::{Circumstance, SeriesRef};
use crate::condition::{Run, RunKey, RunLedger};
use crate::config::WatchConfig;
use crate::error::{AlertError, Result};
use crate::SeriesSource;
use monwatch_common::pattern::{is_literal, series_matches};
use monwatch_common::types::{Level, SeriesKey, Unit};
use monwatch_series::SeriesDataset;
use std::collections::HashMap;

/// Level of one watched (series, instance) and the time it was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub level: Level,
    pub since: i64,
}

/// Level decided for one (series, instance) and the persistence runs
/// folded while deciding it.
pub(crate) struct Step {
    pub level: Level,
    pub runs: Vec<(RunKey, Run)>,
}

/// A named alerting rule over one series (or series pattern) and unit.
///
/// Holds up to three circumstances; a watch where all of them are
/// unspecified is inert and never changes level.
#[derive(Debug, Clone)]
pub struct Watch {
    pub name: String,
    pub watched: SeriesRef,
    pub red: Circumstance,
    pub amber: Circumstance,
    pub green: Circumstance,
    /// Series snapshotted next to the cause when a frame opens.
    pub captures: Vec<String>,
    stopped: bool,
    disabled: bool,
    programmatic: bool,
    states: HashMap<SeriesKey, State>,
    runs: HashMap<RunKey, Run>,
}

impl Watch {
    pub fn new(name: impl Into<String>, series: impl Into<String>, unit: Unit) -> Self {
        Self {
            name: name.into(),
            watched: SeriesRef {
                series: series.into(),
                unit,
            },
            red: Circumstance::unspecified(Level::Red),
            amber: Circumstance::unspecified(Level::Amber),
            green: Circumstance::unspecified(Level::Green),
            captures: Vec::new(),
            stopped: false,
            disabled: false,
            programmatic: false,
            states: HashMap::new(),
            runs: HashMap::new(),
        }
    }

    pub fn with_red(mut self, circumstance: Circumstance) -> Self {
        self.red = Circumstance {
            level: Level::Red,
            ..circumstance
        };
        self
    }

    pub fn with_amber(mut self, circumstance: Circumstance) -> Self {
        self.amber = Circumstance {
            level: Level::Amber,
            ..circumstance
        };
        self
    }

    pub fn with_green(mut self, circumstance: Circumstance) -> Self {
        self.green = Circumstance {
            level: Level::Green,
            ..circumstance
        };
        self
    }

    pub fn capturing(mut self, series: impl Into<String>) -> Self {
        self.captures.push(series.into());
        self
    }

    /// Validates a configuration; nothing is registered when this fails.
    pub fn from_config(config: &WatchConfig) -> Result<Self> {
        let invalid = |reason: String| AlertError::InvalidWatchConfig {
            watch: config.name.clone(),
            reason,
        };

        let name = config.name.trim();
        if name.is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        let series = config.series.trim();
        if series.is_empty() {
            return Err(invalid("series is empty".to_string()));
        }

        let circumstance = |level: Level, c: &Option<crate::config::CircumstanceConfig>| match c {
            Some(c) => Circumstance::from_config(level, c, series).map_err(invalid),
            None => Ok(Circumstance::unspecified(level)),
        };
        let red = circumstance(Level::Red, &config.red)?;
        let amber = circumstance(Level::Amber, &config.amber)?;
        let green = circumstance(Level::Green, &config.green)?;

        let mut captures = Vec::with_capacity(config.captures.len());
        for capture in &config.captures {
            let capture = capture.trim();
            if capture.is_empty() || !is_literal(capture) {
                return Err(invalid(format!(
                    "capture '{capture}' must name a single series"
                )));
            }
            captures.push(capture.to_string());
        }

        Ok(Self {
            name: name.to_string(),
            watched: SeriesRef {
                series: series.to_string(),
                unit: config.unit,
            },
            red,
            amber,
            green,
            captures,
            stopped: config.stopped,
            disabled: config.disabled,
            programmatic: config.programmatic,
            states: HashMap::new(),
            runs: HashMap::new(),
        })
    }

    pub fn to_config(&self) -> WatchConfig {
        WatchConfig {
            name: self.name.clone(),
            series: self.watched.series.clone(),
            unit: self.watched.unit,
            red: self.red.to_config(),
            amber: self.amber.to_config(),
            green: self.green.to_config(),
            captures: self.captures.clone(),
            stopped: self.stopped,
            disabled: self.disabled,
            programmatic: self.programmatic,
        }
    }

    pub fn is_inert(&self) -> bool {
        self.red.is_unspecified() && self.amber.is_unspecified() && self.green.is_unspecified()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_programmatic(&self) -> bool {
        self.programmatic
    }

    /// Whether an evaluation tick should look at this watch at all.
    pub fn is_active(&self) -> bool {
        !self.stopped && !self.disabled && !self.is_inert()
    }

    pub(crate) fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    pub(crate) fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn watches_series(&self, series: &str) -> bool {
        series_matches(&self.watched.series, series)
    }

    pub fn state(&self, key: &SeriesKey) -> Option<State> {
        self.states.get(key).copied()
    }

    pub fn level(&self, key: &SeriesKey) -> Level {
        self.states.get(key).map_or(Level::Green, |s| s.level)
    }

    /// Per (series, instance) states, ordered by key.
    pub fn states(&self) -> Vec<(&SeriesKey, State)> {
        let mut states: Vec<_> = self.states.iter().map(|(k, s)| (k, *s)).collect();
        states.sort_by(|a, b| a.0.cmp(b.0));
        states
    }

    pub(crate) fn set_state(&mut self, key: SeriesKey, state: State) {
        self.states.insert(key, state);
    }

    pub(crate) fn clear_states(&mut self) {
        self.states.clear();
        self.runs.clear();
    }

    pub(crate) fn record_runs(&mut self, runs: Vec<(RunKey, Run)>) {
        self.runs.extend(runs);
    }

    /// Computes the level `data` moves to from `current` in one tick,
    /// continuing the persistence runs recorded by earlier ticks.
    ///
    /// Priority: suppression, red start, amber start, green start, then the
    /// stop condition of the current level. Stopping from RED lands on AMBER
    /// when an amber circumstance exists, otherwise on GREEN.
    pub fn next_level(
        &self,
        current: Level,
        data: &SeriesDataset,
        source: &dyn SeriesSource,
    ) -> Level {
        self.step(current, data, source).level
    }

    pub(crate) fn step(
        &self,
        current: Level,
        data: &SeriesDataset,
        source: &dyn SeriesSource,
    ) -> Step {
        let mut runs = RunLedger::new(&self.runs);
        let instance = data.instance();
        let red_live =
            !self.red.is_unspecified() && !self.red.is_suppressed_tracked(instance, source, &mut runs);
        let amber_live = !self.amber.is_unspecified()
            && !self.amber.is_suppressed_tracked(instance, source, &mut runs);

        // Every condition folds the new samples, whatever the current level.
        let red_starts = self.red.starts_tracked(data, &mut runs);
        let amber_starts = self.amber.starts_tracked(data, &mut runs);
        let green_starts = self.green.starts_tracked(data, &mut runs);
        let red_stops = self.red.stops_tracked(data, &mut runs);
        let amber_stops = self.amber.stops_tracked(data, &mut runs);

        let level = if red_live && current != Level::Red && red_starts {
            Level::Red
        } else if amber_live && current == Level::Green && amber_starts {
            Level::Amber
        } else if current == Level::Green || green_starts {
            Level::Green
        } else {
            let (stops, live) = match current {
                Level::Red => (red_stops, red_live),
                _ => (amber_stops, amber_live),
            };
            if !live || !stops {
                current
            } else if current == Level::Red && !self.amber.is_unspecified() {
                Level::Amber
            } else {
                Level::Green
            }
        };
        Step {
            level,
            runs: runs.into_updates(),
        }
    }
}
