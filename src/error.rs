use thiserror::Error;

/// Failures that abort a whole report.
///
/// There is no per-store isolation: the first error for any store fails the
/// report and is recorded as its cause.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid time-of-day '{value}' for store {store_id} (expected HH:MM)")]
    InvalidTime { store_id: String, value: String },

    #[error("invalid day of week {value} for store {store_id} (expected 0=Monday..6=Sunday)")]
    InvalidDayOfWeek { store_id: String, value: i64 },

    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("invalid poll status '{0}' (expected active or inactive)")]
    InvalidStatus(String),

    #[error("poll table is empty; no reference instant")]
    EmptyDataset,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
