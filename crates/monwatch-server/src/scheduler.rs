use crate::state::Monitor;
use monwatch_alert::engine::TickReport;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Drives one evaluation pass over all watches per tick.
pub struct EvaluationScheduler {
    monitor: Monitor,
    tick_secs: u64,
}

impl EvaluationScheduler {
    pub fn new(monitor: Monitor, tick_secs: u64) -> Self {
        Self { monitor, tick_secs }
    }

    pub async fn run(&self) {
        tracing::info!(tick_secs = self.tick_secs, "Evaluation scheduler started");

        let mut tick = interval(Duration::from_secs(self.tick_secs.max(1)));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            self.tick_once();
        }
    }

    /// Evaluates all watches once and logs the outcome.
    pub fn tick_once(&self) -> TickReport {
        let report = self.monitor.tick();
        for alert in &report.changed {
            tracing::debug!(
                serial = alert.serial(),
                watch = %alert.watch(),
                key = %alert.key(),
                level = %alert.level(),
                ongoing = alert.is_ongoing(),
                "Alert changed"
            );
        }
        if !report.faults.is_empty() {
            tracing::warn!(faults = report.faults.len(), "Evaluation tick finished with faults");
        }
        report
    }
}
