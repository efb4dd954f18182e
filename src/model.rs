/// Core data types shared by ingestion, interpolation and reporting

use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;

use crate::error::ReportError;

/// Store identifiers are opaque keys; they are never parsed.
pub type StoreId = String;

/// Observed status of a store at a poll instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollStatus {
    Active,
    Inactive,
}

impl FromStr for PollStatus {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(PollStatus::Active),
            "inactive" => Ok(PollStatus::Inactive),
            _ => Err(ReportError::InvalidStatus(s.to_string())),
        }
    }
}

/// A single status observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    pub timestamp: DateTime<Utc>,
    pub status: PollStatus,
}

impl Poll {
    pub fn new(timestamp: DateTime<Utc>, status: PollStatus) -> Self {
        Self { timestamp, status }
    }
}

/// Trailing windows reported for every store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    LastHour,
    LastDay,
    LastWeek,
}

impl Window {
    pub const ALL: [Window; 3] = [Window::LastHour, Window::LastDay, Window::LastWeek];

    pub fn length(self) -> Duration {
        match self {
            Window::LastHour => Duration::hours(1),
            Window::LastDay => Duration::days(1),
            Window::LastWeek => Duration::days(7),
        }
    }
}

/// Per-store result row.
///
/// Last-hour figures are whole minutes. Day and week figures are hours
/// rounded to two decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreMetrics {
    pub store_id: StoreId,
    pub uptime_last_hour: i64,
    pub uptime_last_day: f64,
    pub uptime_last_week: f64,
    pub downtime_last_hour: i64,
    pub downtime_last_day: f64,
    pub downtime_last_week: f64,
}

/// Column order of the report artifact
pub const REPORT_HEADER: [&str; 7] = [
    "store_id",
    "uptime_last_hour",
    "uptime_last_day",
    "uptime_last_week",
    "downtime_last_hour",
    "downtime_last_day",
    "downtime_last_week",
];

impl StoreMetrics {
    /// Render as a CSV record in `REPORT_HEADER` order
    pub fn to_record(&self) -> [String; 7] {
        [
            self.store_id.clone(),
            self.uptime_last_hour.to_string(),
            format!("{:.2}", self.uptime_last_day),
            format!("{:.2}", self.uptime_last_week),
            self.downtime_last_hour.to_string(),
            format!("{:.2}", self.downtime_last_day),
            format!("{:.2}", self.downtime_last_week),
        ]
    }
}
