//! Bounded multi-resolution time-series storage.
//!
//! Every (series, instance) pair owns a [`dataset::SeriesDataset`]: a fixed
//! capacity ring of raw points with O(1) running statistics, feeding a chain
//! of minute, hour and day [`aggregate::AggregateDataset`] tiers. Sealed
//! buckets only ever flow from finer to coarser tiers; each tier is read
//! directly. The [`store::SeriesStore`] is the single ingestion entry point
//! and hands out consistent snapshots to readers.

pub mod aggregate;
pub mod annotation;
pub mod config;
pub mod dataset;
pub mod error;
pub mod store;


pub use annotation::Annotation;
pub use config::RetentionConfig;
pub use dataset::SeriesDataset;
pub use error::{Result, SeriesError};
pub use store::SeriesStore;
