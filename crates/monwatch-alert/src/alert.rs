use monwatch_common::types::{Level, SeriesKey};
use monwatch_series::SeriesDataset;

/// One level within an alert's lifetime.
#[derive(Debug, Clone)]
pub struct Frame {
    pub level: Level,
    pub start: i64,
    /// `None` while this is the alert's current frame.
    pub end: Option<i64>,
    /// Snapshot of the watched series at the transition.
    pub cause: SeriesDataset,
    /// Snapshots of the watch's captured series for the same instance.
    pub captured: Vec<SeriesDataset>,
}

impl Frame {
    pub fn new(level: Level, start: i64, cause: SeriesDataset, captured: Vec<SeriesDataset>) -> Self {
        Self {
            level,
            start,
            end: None,
            cause,
            captured,
        }
    }

    pub fn is_current(&self) -> bool {
        self.end.is_none()
    }
}

/// A breach of a watch for one (series, instance), from leaving GREEN until
/// returning to it.
///
/// Alerts are shared as `Arc<Alert>` and replaced as a whole on change, so a
/// reader always holds a complete alert.
#[derive(Debug, Clone)]
pub struct Alert {
    serial: u32,
    watch: String,
    key: SeriesKey,
    level: Level,
    start_time: i64,
    end_time: Option<i64>,
    acknowledged: bool,
    stopped: bool,
    frames: Vec<Frame>,
}

impl Alert {
    pub(crate) fn open(serial: u32, watch: impl Into<String>, key: SeriesKey, frame: Frame) -> Self {
        Self {
            serial,
            watch: watch.into(),
            key,
            level: frame.level,
            start_time: frame.start,
            end_time: None,
            acknowledged: false,
            stopped: false,
            frames: vec![frame],
        }
    }

    /// Ends the current frame and opens `frame` at its start time.
    pub(crate) fn transition(&mut self, frame: Frame) {
        self.end_current_frame(frame.start);
        self.level = frame.level;
        self.frames.push(frame);
    }

    pub(crate) fn close(&mut self, time: i64) {
        self.end_current_frame(time);
        self.end_time = Some(time);
    }

    /// Closes the alert because its watch was stopped, disabled or removed.
    pub(crate) fn stop(&mut self, time: i64) {
        self.close(time);
        self.stopped = true;
    }

    /// Returns true when the flag changed.
    pub(crate) fn acknowledge(&mut self) -> bool {
        !std::mem::replace(&mut self.acknowledged, true)
    }

    fn end_current_frame(&mut self, time: i64) {
        if let Some(frame) = self.frames.last_mut().filter(|f| f.is_current()) {
            frame.end = Some(time.max(frame.start));
        }
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Name of the watch that raised this alert.
    pub fn watch(&self) -> &str {
        &self.watch
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

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn end_time(&self) -> Option<i64> {
        self.end_time
    }

    pub fn is_ongoing(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last().filter(|f| f.is_current())
    }

    /// The most recent frame, closed or not.
    pub fn end_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }
}
