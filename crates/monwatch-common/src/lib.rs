//! Shared vocabulary for the monitoring core: series identity, raw points,
//! alert levels, units and threshold comparisons.

pub mod pattern;
pub mod types;
