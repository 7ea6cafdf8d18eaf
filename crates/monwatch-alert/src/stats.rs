use crate::alert::Alert;
use monwatch_common::types::Level;
use serde::Serialize;
use std::collections::BTreeMap;

/// Dashboard counters derived from the current alert set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertStatistics {
    pub watch_count: usize,
    /// Total level changes since the engine started; pollers diff successive values.
    pub change_count: u64,
    pub unacknowledged_red_alerts: usize,
    pub acknowledged_red_alerts: usize,
    pub unacknowledged_amber_alerts: usize,
    pub acknowledged_amber_alerts: usize,
    /// Instances with ongoing alerts; indexes the two histograms below.
    pub instances: Vec<String>,
    pub ongoing_red_alerts: Vec<usize>,
    pub ongoing_amber_alerts: Vec<usize>,
}

impl AlertStatistics {
    /// Pure function of the given alerts; closed alerts are ignored.
    pub fn compute<'a, I>(watch_count: usize, change_count: u64, alerts: I) -> Self
    where
        I: IntoIterator<Item = &'a Alert>,
    {
        let mut stats = Self {
            watch_count,
            change_count,
            ..Self::default()
        };
        let mut per_instance: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

        for alert in alerts.into_iter().filter(|a| a.is_ongoing()) {
            let counts = per_instance.entry(alert.instance()).or_default();
            match (alert.level(), alert.is_acknowledged()) {
                (Level::Red, true) => stats.acknowledged_red_alerts += 1,
                (Level::Red, false) => stats.unacknowledged_red_alerts += 1,
                (Level::Amber, true) => stats.acknowledged_amber_alerts += 1,
                (Level::Amber, false) => stats.unacknowledged_amber_alerts += 1,
                (Level::Green, _) => continue,
            }
            if alert.level() == Level::Red {
                counts.0 += 1;
            } else {
                counts.1 += 1;
            }
        }

        for (instance, (red, amber)) in per_instance {
            stats.instances.push(instance.to_string());
            stats.ongoing_red_alerts.push(red);
            stats.ongoing_amber_alerts.push(amber);
        }
        stats
    }

    pub fn red_alerts(&self) -> usize {
        self.unacknowledged_red_alerts + self.acknowledged_red_alerts
    }

    pub fn amber_alerts(&self) -> usize {
        self.unacknowledged_amber_alerts + self.acknowledged_amber_alerts
    }
}
