use crate::config::ConditionConfig;
use monwatch_common::types::{Comparison, Level, SeriesKey};
use monwatch_series::SeriesDataset;
use std::collections::HashMap;
use std::fmt;

/// How long a condition must have held before it counts as satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// The last `n` samples, current one included, all qualify.
    Times(u32),
    /// Qualifying samples span at least this many milliseconds up to the current one.
    Millis(i64),
}

/// A threshold comparison with an optional persistence requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub comparison: Comparison,
    pub threshold: i64,
    pub for_last: Option<Persistence>,
    /// Compare minute averages instead of raw samples.
    pub on_average: bool,
}

impl Condition {
    pub fn new(comparison: Comparison, threshold: i64) -> Self {
        Self {
            comparison,
            threshold,
            for_last: None,
            on_average: false,
        }
    }

    pub fn for_times(mut self, times: u32) -> Self {
        self.for_last = Some(Persistence::Times(times));
        self
    }

    pub fn for_millis(mut self, millis: i64) -> Self {
        self.for_last = Some(Persistence::Millis(millis));
        self
    }

    pub fn on_average(mut self) -> Self {
        self.on_average = true;
        self
    }

    /// Validates and converts a config shape.
    pub fn from_config(config: &ConditionConfig) -> Result<Self, String> {
        let for_last = match (config.for_times, config.for_millis) {
            (Some(_), Some(_)) => {
                return Err("for_times and for_millis are mutually exclusive".to_string())
            }
            (Some(0), None) => return Err("for_times must be at least 1".to_string()),
            (Some(times), None) => Some(Persistence::Times(times)),
            (None, Some(millis)) if millis < 0 => {
                return Err(format!("for_millis must not be negative, got {millis}"))
            }
            (None, Some(millis)) => Some(Persistence::Millis(millis)),
            (None, None) => None,
        };
        Ok(Self {
            comparison: config.operator,
            threshold: config.threshold,
            for_last,
            on_average: config.on_average,
        })
    }

    pub fn to_config(&self) -> ConditionConfig {
        ConditionConfig {
            operator: self.comparison,
            threshold: self.threshold,
            for_times: match self.for_last {
                Some(Persistence::Times(times)) => Some(times),
                _ => None,
            },
            for_millis: match self.for_last {
                Some(Persistence::Millis(millis)) => Some(millis),
                _ => None,
            },
            on_average: self.on_average,
        }
    }

    /// Evaluates the condition against the latest data of `data` with no
    /// history beyond what `data` retains.
    pub fn is_satisfied(&self, data: &SeriesDataset) -> bool {
        self.evaluate(data, None).0
    }

    /// Evaluates the condition, continuing the qualifying run left by the
    /// previous evaluation of the same dataset.
    ///
    /// Raw mode folds every sample ingested since `previous`; average mode
    /// folds newly sealed minute buckets and then looks at the open one.
    /// When samples were evicted before they could be folded the run
    /// restarts from the retained data. Returns whether the condition holds
    /// and the run to pass to the next evaluation.
    pub fn evaluate(&self, data: &SeriesDataset, previous: Option<Run>) -> (bool, Run) {
        if self.on_average {
            let minutes = data.minutes();
            let (mut run, fresh) = Run::resume(previous, minutes.sealed_total(), minutes.len());
            for bucket in minutes.buckets().skip(minutes.len() - fresh) {
                run.push(bucket.start, self.comparison.holds_avg(bucket.avg, self.threshold));
            }
            // The open bucket is still filling, so it never enters the stored run.
            let satisfied = minutes.open_bucket().is_some_and(|open| {
                let mut current = run;
                current.push(open.start, self.comparison.holds_avg(open.avg, self.threshold));
                current.satisfies(self.for_last, open.start)
            });
            (satisfied, run)
        } else {
            let (mut run, fresh) = Run::resume(previous, data.observed_values(), data.len());
            for point in data.points().skip(data.len() - fresh) {
                run.push(point.time, self.comparison.holds(point.value, self.threshold));
            }
            let satisfied = data
                .last_time()
                .is_some_and(|time| run.satisfies(self.for_last, time));
            (satisfied, run)
        }
    }

    /// True when the current sample alone no longer meets the comparison.
    pub fn is_released(&self, data: &SeriesDataset) -> bool {
        let current = if self.on_average {
            data.minutes()
                .recent_averages()
                .next()
                .map(|(_, avg)| self.comparison.holds_avg(avg, self.threshold))
        } else {
            data.last_value()
                .map(|value| self.comparison.holds(value, self.threshold))
        };
        current == Some(false)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.on_average {
            write!(f, "avg ")?;
        }
        write!(f, "value {} {}", self.comparison, self.threshold)?;
        match self.for_last {
            Some(Persistence::Times(times)) => write!(f, " for {times}x"),
            Some(Persistence::Millis(millis)) => write!(f, " for {millis}ms"),
            None => Ok(()),
        }
    }
}

/// The unbroken run of qualifying samples ending at the newest sample
/// folded so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Run {
    /// Samples folded since the dataset was created, evicted ones included.
    seen: u64,
    count: u64,
    since: Option<i64>,
}

impl Run {
    /// Picks up `previous` for a dataset that has produced `total` samples
    /// and still retains `retained` of them. Also returns how many of the
    /// newest retained samples still need folding.
    fn resume(previous: Option<Run>, total: u64, retained: usize) -> (Self, usize) {
        let mut run = previous.filter(|r| r.seen <= total).unwrap_or_default();
        let unseen = total - run.seen;
        if unseen > retained as u64 {
            run = Run::default();
        }
        run.seen = total;
        (run, unseen.min(retained as u64) as usize)
    }

    fn push(&mut self, time: i64, qualifies: bool) {
        if qualifies {
            self.count = self.count.saturating_add(1);
            self.since.get_or_insert(time);
        } else {
            self.count = 0;
            self.since = None;
        }
    }

    /// The newest folded sample must qualify. Count persistence needs `n`
    /// samples in a row; duration persistence measures from the first
    /// sample of the run up to `current`.
    fn satisfies(&self, requirement: Option<Persistence>, current: i64) -> bool {
        let Some(since) = self.since else {
            return false;
        };
        match requirement {
            None => true,
            Some(Persistence::Times(times)) => self.count >= u64::from(times),
            Some(Persistence::Millis(millis)) => current.saturating_sub(since) >= millis,
        }
    }

    /// Length of the current run.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Time of the first sample of the current run.
    pub fn since(&self) -> Option<i64> {
        self.since
    }
}

/// What a condition decides for its circumstance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Role {
    Start,
    Stop,
    Suppress,
}

/// Key: (circumstance level, role, evaluated series key)
pub(crate) type RunKey = (Level, Role, SeriesKey);

/// Runs read during one evaluation and the updated runs it produced.
#[derive(Debug, Default)]
pub(crate) struct RunLedger<'a> {
    previous: Option<&'a HashMap<RunKey, Run>>,
    updates: Vec<(RunKey, Run)>,
}

impl<'a> RunLedger<'a> {
    pub(crate) fn new(previous: &'a HashMap<RunKey, Run>) -> Self {
        Self {
            previous: Some(previous),
            updates: Vec::new(),
        }
    }

    pub(crate) fn check(
        &mut self,
        level: Level,
        role: Role,
        condition: &Condition,
        data: &SeriesDataset,
    ) -> bool {
        let key = (level, role, data.key().clone());
        let previous = self.previous.and_then(|runs| runs.get(&key)).copied();
        let (satisfied, run) = condition.evaluate(data, previous);
        self.updates.push((key, run));
        satisfied
    }

    pub(crate) fn into_updates(self) -> Vec<(RunKey, Run)> {
        self.updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monwatch_common::types::{Point, SeriesKey};
    use monwatch_series::RetentionConfig;

    fn dataset(points: &[(i64, i64)]) -> SeriesDataset {
        let mut data = SeriesDataset::new(SeriesKey::new("cpu", "a"), &RetentionConfig::default());
        for &(time, value) in points {
            data.add(Point::new(time, value)).unwrap();
        }
        data
    }

    #[test]
    fn no_persistence_needs_only_current() {
        let cond = Condition::new(Comparison::GreaterThan, 90);
        assert!(cond.is_satisfied(&dataset(&[(0, 10), (1, 95)])));
        assert!(!cond.is_satisfied(&dataset(&[(0, 95), (1, 10)])));
        assert!(!cond.is_satisfied(&dataset(&[])));
    }

    #[test]
    fn count_persistence_includes_current() {
        let cond = Condition::new(Comparison::GreaterThan, 90).for_times(3);
        assert!(!cond.is_satisfied(&dataset(&[(0, 10), (1, 95), (2, 95)])));
        assert!(cond.is_satisfied(&dataset(&[(0, 95), (1, 95), (2, 95)])));
        // not enough history yet
        assert!(!cond.is_satisfied(&dataset(&[(1, 95), (2, 95)])));
    }

    #[test]
    fn duration_persistence_measures_unbroken_run() {
        let cond = Condition::new(Comparison::GreaterThan, 90).for_millis(2_000);
        assert!(!cond.is_satisfied(&dataset(&[(0, 95), (1_000, 10), (2_000, 95), (3_000, 95)])));
        assert!(cond.is_satisfied(&dataset(&[(1_000, 10), (2_000, 95), (3_000, 95), (4_000, 95)])));
    }

    fn small(raw_capacity: usize) -> SeriesDataset {
        let config = RetentionConfig {
            raw_capacity,
            ..RetentionConfig::default()
        };
        SeriesDataset::new(SeriesKey::new("cpu", "a"), &config)
    }

    #[test]
    fn run_outlives_the_raw_ring() {
        let cond = Condition::new(Comparison::GreaterThan, 90).for_times(5);
        let mut data = small(3);
        let mut run = None;
        let mut satisfied = Vec::new();
        for time in 0..6 {
            data.add(Point::new(time * 1_000, 95)).unwrap();
            let (ok, next) = cond.evaluate(&data, run);
            satisfied.push(ok);
            run = Some(next);
        }
        assert_eq!(satisfied, vec![false, false, false, false, true, true]);
        assert_eq!(run.map(|r| r.count()), Some(6));
        assert_eq!(run.and_then(|r| r.since()), Some(0));

        // without history only the three retained points count
        assert!(!cond.is_satisfied(&data));
    }

    #[test]
    fn evicted_unseen_samples_restart_the_run() {
        let cond = Condition::new(Comparison::GreaterThan, 90).for_times(4);
        let mut data = small(3);
        data.add(Point::new(0, 95)).unwrap();
        let (_, run) = cond.evaluate(&data, None);

        // a low sample slipped out of the ring between evaluations
        for (time, value) in [(1_000, 10), (2_000, 95), (3_000, 95), (4_000, 95)] {
            data.add(Point::new(time, value)).unwrap();
        }
        let (ok, run) = cond.evaluate(&data, Some(run));
        assert!(!ok);
        assert_eq!(run.count(), 3);
        assert_eq!(run.since(), Some(2_000));
    }

    #[test]
    fn extreme_times_do_not_overflow() {
        let cond = Condition::new(Comparison::GreaterThan, 90).for_millis(i64::MAX);
        assert!(!cond.is_satisfied(&dataset(&[(1, 95), (i64::MAX, 95)])));
        // the span saturates instead of wrapping
        assert!(cond.is_satisfied(&dataset(&[(i64::MIN, 95), (0, 95)])));
    }

    #[test]
    fn average_mode_reads_minute_tier() {
        // minute 0 averages 90, the open minute 1 holds 95
        let data = dataset(&[(0, 80), (30_000, 100), (60_000, 95)]);

        let at_least = Condition::new(Comparison::GreaterEqual, 90).on_average().for_times(2);
        assert!(at_least.is_satisfied(&data));

        let above = Condition::new(Comparison::GreaterThan, 90).on_average().for_times(2);
        assert!(!above.is_satisfied(&data));
        assert!(!above.is_released(&data));
    }

    #[test]
    fn release_looks_at_current_sample_only() {
        let data = dataset(&[(0, 95), (1_000, 95), (2_000, 50)]);
        let cond = Condition::new(Comparison::GreaterThan, 90).for_times(2);
        assert!(cond.is_released(&data));
        assert!(!cond.is_satisfied(&data));
        assert!(!cond.is_released(&dataset(&[])));
    }

    #[test]
    fn config_validation() {
        let mut config = Condition::new(Comparison::LessThan, 5).for_times(2).to_config();
        assert_eq!(Condition::from_config(&config).unwrap().for_last, Some(Persistence::Times(2)));

        config.for_millis = Some(1_000);
        assert!(Condition::from_config(&config).is_err());

        config.for_times = Some(0);
        config.for_millis = None;
        assert!(Condition::from_config(&config).is_err());

        config.for_times = None;
        config.for_millis = Some(-1);
        assert!(Condition::from_config(&config).is_err());
    }

    #[test]
    fn display_reads_like_a_rule() {
        let cond = Condition::new(Comparison::GreaterThan, 90).for_times(3);
        assert_eq!(cond.to_string(), "value > 90 for 3x");
        let cond = Condition::new(Comparison::LessEqual, 10).on_average().for_millis(500);
        assert_eq!(cond.to_string(), "avg value <= 10 for 500ms");
    }
}
