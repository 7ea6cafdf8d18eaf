use crate::config::RetentionConfig;
use monwatch_common::types::Point;
use serde::Serialize;
use std::collections::VecDeque;

pub const MINUTE_MS: i64 = 60_000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Time resolution of an aggregate tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Minutes,
    Hours,
    Days,
}

impl Resolution {
    pub fn interval_ms(self) -> i64 {
        match self {
            Resolution::Minutes => MINUTE_MS,
            Resolution::Hours => HOUR_MS,
            Resolution::Days => DAY_MS,
        }
    }

    /// Start of the interval `time` falls into.
    pub fn align(self, time: i64) -> i64 {
        time.saturating_sub(time.rem_euclid(self.interval_ms()))
    }
}

/// Summary of all samples that fell into one interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bucket {
    pub start: i64,
    pub interval: i64,
    pub min: i64,
    pub max: i64,
    pub avg: f64,
    pub count: u64,
}

impl Bucket {
    pub fn end(&self) -> i64 {
        self.start.saturating_add(self.interval)
    }

    pub fn contains(&self, time: i64) -> bool {
        time >= self.start && time < self.end()
    }

    // Weighted running mean; source samples are never revisited.
    fn absorb(&mut self, min: i64, max: i64, avg: f64, count: u64) {
        let total = self.count + count;
        if total > 0 {
            self.avg += (avg - self.avg) * (count as f64 / total as f64);
        }
        self.min = self.min.min(min);
        self.max = self.max.max(max);
        self.count = total;
    }
}

/// A fixed-capacity ring of sealed buckets plus the bucket currently filling.
///
/// The minute, hour and day tiers are all instances of this type; only the
/// resolution and capacity differ.
#[derive(Debug, Clone)]
pub struct AggregateDataset {
    resolution: Resolution,
    capacity: usize,
    sealed: VecDeque<Bucket>,
    open: Option<Bucket>,
    sealed_total: u64,
}

impl AggregateDataset {
    pub fn new(resolution: Resolution, capacity: usize) -> Self {
        Self {
            resolution,
            capacity: capacity.max(1),
            sealed: VecDeque::with_capacity(capacity.max(1)),
            open: None,
            sealed_total: 0,
        }
    }

    /// Adds one sample (a raw point or a sealed finer-grained bucket).
    ///
    /// Returns the bucket that got sealed when `time` crossed into a later
    /// interval, so the caller can forward it to the next coarser tier.
    pub(crate) fn add(
        &mut self,
        time: i64,
        min: i64,
        max: i64,
        avg: f64,
        count: u64,
    ) -> Option<Bucket> {
        let start = self.resolution.align(time);
        if let Some(open) = self.open.as_mut() {
            if start <= open.start {
                open.absorb(min, max, avg, count);
                return None;
            }
        }
        let next = Bucket {
            start,
            interval: self.resolution.interval_ms(),
            min,
            max,
            avg,
            count,
        };
        let sealed = self.open.replace(next)?;
        if self.sealed.len() == self.capacity {
            self.sealed.pop_front();
        }
        self.sealed.push_back(sealed);
        self.sealed_total += 1;
        Some(sealed)
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn interval_ms(&self) -> i64 {
        self.resolution.interval_ms()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True until the first bucket has been sealed.
    pub fn is_empty(&self) -> bool {
        self.sealed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sealed.len()
    }

    /// Number of buckets sealed since creation, including evicted ones.
    pub fn sealed_total(&self) -> u64 {
        self.sealed_total
    }

    /// Sealed buckets, oldest first.
    pub fn buckets(&self) -> impl DoubleEndedIterator<Item = &Bucket> + '_ {
        self.sealed.iter()
    }

    pub fn open_bucket(&self) -> Option<&Bucket> {
        self.open.as_ref()
    }

    pub fn last_sealed(&self) -> Option<&Bucket> {
        self.sealed.back()
    }

    pub fn first_time(&self) -> Option<i64> {
        self.sealed.front().map(|b| b.start)
    }

    pub fn mins(&self) -> Vec<i64> {
        self.sealed.iter().map(|b| b.min).collect()
    }

    pub fn maxs(&self) -> Vec<i64> {
        self.sealed.iter().map(|b| b.max).collect()
    }

    pub fn avgs(&self) -> Vec<f64> {
        self.sealed.iter().map(|b| b.avg).collect()
    }

    pub fn point_counts(&self) -> Vec<u64> {
        self.sealed.iter().map(|b| b.count).collect()
    }

    /// Rolling averages newest first: the open bucket, then sealed buckets.
    /// Each item is `(bucket start, average)`.
    pub fn recent_averages(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.open
            .iter()
            .chain(self.sealed.iter().rev())
            .map(|b| (b.start, b.avg))
    }
}

/// The minute → hour → day rollup chain of one series.
#[derive(Debug, Clone)]
pub struct AggregateChain {
    minutes: AggregateDataset,
    hours: AggregateDataset,
    days: AggregateDataset,
    forwarded: u64,
}

impl AggregateChain {
    pub fn new(config: &RetentionConfig) -> Self {
        Self {
            minutes: AggregateDataset::new(Resolution::Minutes, config.minute_buckets),
            hours: AggregateDataset::new(Resolution::Hours, config.hour_buckets),
            days: AggregateDataset::new(Resolution::Days, config.day_buckets),
            forwarded: 0,
        }
    }

    pub(crate) fn add_point(&mut self, point: Point) {
        let Some(minute) = self.minutes.add(
            point.time,
            point.value,
            point.value,
            point.value as f64,
            1,
        ) else {
            return;
        };
        self.forwarded += 1;
        let Some(hour) = self
            .hours
            .add(minute.start, minute.min, minute.max, minute.avg, minute.count)
        else {
            return;
        };
        self.forwarded += 1;
        // sealed days are the end of the chain
        self.days
            .add(hour.start, hour.min, hour.max, hour.avg, hour.count);
    }

    pub fn minutes(&self) -> &AggregateDataset {
        &self.minutes
    }

    pub fn hours(&self) -> &AggregateDataset {
        &self.hours
    }

    pub fn days(&self) -> &AggregateDataset {
        &self.days
    }

    /// Number of sealed buckets handed to a coarser tier.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }
}
