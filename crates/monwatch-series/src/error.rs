use monwatch_common::types::SeriesKey;

/// Errors raised by the series store.
///
/// # Examples
///
/// ```rust
/// use monwatch_common::types::SeriesKey;
/// use monwatch_series::error::SeriesError;
///
/// let err = SeriesError::OutOfOrderSample {
///     key: SeriesKey::new("cpu", "server1"),
///     last: 2_000,
///     given: 1_000,
/// };
/// assert!(err.to_string().contains("cpu@server1"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    /// A point arrived with a timestamp older than the last recorded one.
    /// The store never reorders; the collector decides whether to drop or re-stamp it.
    #[error("Series: out-of-order sample for {key} (last={last}, given={given})")]
    OutOfOrderSample { key: SeriesKey, last: i64, given: i64 },

    /// A retention setting that would leave a tier without room for a single entry.
    #[error("Series: invalid retention config: {0}")]
    InvalidRetention(String),
}

/// Convenience `Result` alias for series operations.
pub type Result<T> = std::result::Result<T, SeriesError>;
