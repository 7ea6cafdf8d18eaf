/// Errors raised by watch configuration and the alert engine.
///
/// # Examples
///
/// ```rust
/// use monwatch_alert::error::AlertError;
///
/// let err = AlertError::InvalidWatchConfig {
///     watch: "cpu-high".to_string(),
///     reason: "red: for_times and for_millis are mutually exclusive".to_string(),
/// };
/// assert!(err.to_string().contains("cpu-high"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertError {
    /// A watch configuration failed validation and was not registered.
    #[error("Alert: invalid watch config '{watch}': {reason}")]
    InvalidWatchConfig { watch: String, reason: String },

    #[error("Alert: no watch named '{0}'")]
    UnknownWatch(String),

    #[error("Alert: no alert with serial {0}")]
    UnknownAlert(u32),

    /// Evaluating one watch failed; other watches of the same tick are unaffected.
    #[error("Alert: evaluation of watch '{watch}' failed: {reason}")]
    Evaluation { watch: String, reason: String },

    #[error("Alert: serial numbers exhausted")]
    SerialExhausted,
}

/// Convenience `Result` alias for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
