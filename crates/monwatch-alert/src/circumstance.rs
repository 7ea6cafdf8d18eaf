use crate::condition::{Condition, Role, RunLedger};
use crate::config::{CircumstanceConfig, ConditionConfig};
use crate::SeriesSource;
use monwatch_common::pattern::is_literal;
use monwatch_common::types::{Level, Unit};
use monwatch_series::SeriesDataset;

/// Non-owning reference to another series, resolved through a
/// [`SeriesSource`] at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesRef {
    pub series: String,
    pub unit: Unit,
}

/// The start/stop/suppress conditions that lead into one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circumstance {
    pub level: Level,
    pub start: Option<Condition>,
    pub stop: Option<Condition>,
    pub suppress: Option<Condition>,
    pub suppressing: Option<SeriesRef>,
}

impl Circumstance {
    pub fn unspecified(level: Level) -> Self {
        Self {
            level,
            start: None,
            stop: None,
            suppress: None,
            suppressing: None,
        }
    }

    pub fn new(level: Level, start: Condition) -> Self {
        Self {
            start: Some(start),
            ..Self::unspecified(level)
        }
    }

    pub fn with_stop(mut self, stop: Condition) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn suppressed_by(mut self, series: impl Into<String>, unit: Unit, suppress: Condition) -> Self {
        self.suppressing = Some(SeriesRef {
            series: series.into(),
            unit,
        });
        self.suppress = Some(suppress);
        self
    }

    pub fn is_unspecified(&self) -> bool {
        self.start.is_none() && self.stop.is_none() && self.suppress.is_none()
    }

    pub(crate) fn from_config(
        level: Level,
        config: &CircumstanceConfig,
        watched_series: &str,
    ) -> Result<Self, String> {
        let condition = |name: &str, c: &Option<ConditionConfig>| {
            c.as_ref()
                .map(Condition::from_config)
                .transpose()
                .map_err(|e| format!("{level}.{name}: {e}"))
        };
        let start = condition("start", &config.start)?;
        let stop = condition("stop", &config.stop)?;
        let suppress = condition("suppress", &config.suppress)?;

        if start.is_none() && (stop.is_some() || suppress.is_some()) {
            return Err(format!("{level}: stop or suppress given without a start condition"));
        }

        let suppressing = match (&suppress, &config.suppressing_series) {
            (None, None) => None,
            (Some(_), None) => {
                return Err(format!("{level}: suppress condition needs a suppressing_series"))
            }
            (None, Some(series)) => {
                return Err(format!(
                    "{level}: suppressing_series '{series}' given without a suppress condition"
                ))
            }
            (Some(_), Some(series)) => {
                let series = series.trim();
                if series.is_empty() {
                    return Err(format!("{level}: suppressing_series is empty"));
                }
                if !is_literal(series) {
                    return Err(format!(
                        "{level}: suppressing_series '{series}' must name a single series"
                    ));
                }
                if series == watched_series {
                    return Err(format!("{level}: a series cannot suppress itself"));
                }
                Some(SeriesRef {
                    series: series.to_string(),
                    unit: config.suppressing_unit.unwrap_or_default(),
                })
            }
        };

        Ok(Self {
            level,
            start,
            stop,
            suppress,
            suppressing,
        })
    }

    pub fn to_config(&self) -> Option<CircumstanceConfig> {
        if self.is_unspecified() {
            return None;
        }
        Some(CircumstanceConfig {
            start: self.start.as_ref().map(Condition::to_config),
            stop: self.stop.as_ref().map(Condition::to_config),
            suppress: self.suppress.as_ref().map(Condition::to_config),
            suppressing_series: self.suppressing.as_ref().map(|s| s.series.clone()),
            suppressing_unit: self.suppressing.as_ref().map(|s| s.unit),
        })
    }

    pub fn starts(&self, data: &SeriesDataset) -> bool {
        self.starts_tracked(data, &mut RunLedger::default())
    }

    /// Without an explicit stop condition, the circumstance stops as soon as
    /// the current sample no longer meets the start comparison.
    pub fn stops(&self, data: &SeriesDataset) -> bool {
        self.stops_tracked(data, &mut RunLedger::default())
    }

    /// True when the suppressing series of the same instance currently meets
    /// the suppress condition. Missing data never suppresses.
    pub fn is_suppressed(&self, instance: &str, source: &dyn SeriesSource) -> bool {
        self.is_suppressed_tracked(instance, source, &mut RunLedger::default())
    }

    pub(crate) fn starts_tracked(&self, data: &SeriesDataset, runs: &mut RunLedger<'_>) -> bool {
        self.start
            .as_ref()
            .is_some_and(|c| runs.check(self.level, Role::Start, c, data))
    }

    pub(crate) fn stops_tracked(&self, data: &SeriesDataset, runs: &mut RunLedger<'_>) -> bool {
        match (&self.stop, &self.start) {
            (Some(stop), _) => runs.check(self.level, Role::Stop, stop, data),
            (None, Some(start)) => start.is_released(data),
            (None, None) => true,
        }
    }

    pub(crate) fn is_suppressed_tracked(
        &self,
        instance: &str,
        source: &dyn SeriesSource,
        runs: &mut RunLedger<'_>,
    ) -> bool {
        let (Some(suppress), Some(suppressing)) = (&self.suppress, &self.suppressing) else {
            return false;
        };
        source
            .snapshot(&suppressing.series, instance)
            .is_some_and(|data| runs.check(self.level, Role::Suppress, suppress, &data))
    }
}
