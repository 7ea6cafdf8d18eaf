use crate::aggregate::{AggregateChain, AggregateDataset};
use crate::config::RetentionConfig;
use crate::error::{Result, SeriesError};
use monwatch_common::types::{Point, SeriesKey};
use std::collections::VecDeque;

/// Raw points and running statistics of one (series, instance).
///
/// Raw points live in a fixed-capacity ring; once evicted they are only
/// visible through the aggregate tiers. The `observed_*` statistics cover
/// every point ever added, not just the retained ones.
#[derive(Debug, Clone)]
pub struct SeriesDataset {
    key: SeriesKey,
    capacity: usize,
    points: VecDeque<Point>,
    observed_min: i64,
    observed_max: i64,
    observed_sum: i128,
    observed_values: u64,
    observed_value_changes: u64,
    observed_since: i64,
    stable_count: u64,
    stable_since: i64,
    aggregates: AggregateChain,
}

impl SeriesDataset {
    pub fn new(key: SeriesKey, config: &RetentionConfig) -> Self {
        let capacity = config.raw_capacity.max(1);
        Self {
            key,
            capacity,
            points: VecDeque::with_capacity(capacity),
            observed_min: i64::MAX,
            observed_max: i64::MIN,
            observed_sum: 0,
            observed_values: 0,
            observed_value_changes: 0,
            observed_since: 0,
            stable_count: 0,
            stable_since: 0,
            aggregates: AggregateChain::new(config),
        }
    }

    /// Appends a point. Timestamps must be non-decreasing.
    pub fn add(&mut self, point: Point) -> Result<()> {
        let previous = self.points.back().copied();
        if let Some(last) = previous {
            if point.time < last.time {
                return Err(SeriesError::OutOfOrderSample {
                    key: self.key.clone(),
                    last: last.time,
                    given: point.time,
                });
            }
        }

        if self.observed_values == 0 {
            self.observed_since = point.time;
        }
        self.observed_min = self.observed_min.min(point.value);
        self.observed_max = self.observed_max.max(point.value);
        self.observed_sum += i128::from(point.value);
        self.observed_values += 1;

        match previous {
            Some(last) if last.value == point.value => self.stable_count += 1,
            Some(_) => {
                self.observed_value_changes += 1;
                self.stable_count = 1;
                self.stable_since = point.time;
            }
            None => {
                self.stable_count = 1;
                self.stable_since = point.time;
            }
        }

        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
        self.aggregates.add_point(point);
        Ok(())
    }

    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    pub fn series(&self) -> &str {
        &self.key.series
    }

    pub fn instance(&self) -> &str {
        &self.key.instance
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Retained raw points, oldest first.
    pub fn points(&self) -> impl DoubleEndedIterator<Item = &Point> + ExactSizeIterator + '_ {
        self.points.iter()
    }

    pub fn last_point(&self) -> Option<Point> {
        self.points.back().copied()
    }

    pub fn last_time(&self) -> Option<i64> {
        self.points.back().map(|p| p.time)
    }

    pub fn last_value(&self) -> Option<i64> {
        self.points.back().map(|p| p.value)
    }

    pub fn observed_min(&self) -> i64 {
        self.observed_min
    }

    pub fn observed_max(&self) -> i64 {
        self.observed_max
    }

    pub fn observed_sum(&self) -> i128 {
        self.observed_sum
    }

    pub fn observed_values(&self) -> u64 {
        self.observed_values
    }

    pub fn observed_value_changes(&self) -> u64 {
        self.observed_value_changes
    }

    /// Time of the first point ever added (not of the oldest retained one).
    pub fn observed_since(&self) -> i64 {
        self.observed_since
    }

    pub fn observed_average(&self) -> Option<f64> {
        (self.observed_values > 0).then(|| self.observed_sum as f64 / self.observed_values as f64)
    }

    /// Number of consecutive most recent points equal to the last value.
    pub fn stable_count(&self) -> u64 {
        self.stable_count
    }

    /// True when every retained point, or every point ever observed, carries
    /// the current value.
    pub fn is_stable(&self) -> bool {
        !self.is_empty()
            && (self.stable_count >= self.points.len() as u64
                || self.stable_count >= self.observed_values)
    }

    /// Time since which the value has not changed.
    pub fn stable_since(&self) -> i64 {
        self.stable_since
    }

    pub fn aggregates(&self) -> &AggregateChain {
        &self.aggregates
    }

    pub fn minutes(&self) -> &AggregateDataset {
        self.aggregates.minutes()
    }

    pub fn hours(&self) -> &AggregateDataset {
        self.aggregates.hours()
    }

    pub fn days(&self) -> &AggregateDataset {
        self.aggregates.days()
    }
}
