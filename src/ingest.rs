//! Input table ingestion
//!
//! The three CSV tables are read once at startup into an immutable
//! [`Dataset`] that every report shares.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::error::ReportError;
use crate::hours::{BusinessHourRule, BusinessHoursTable};
use crate::model::{Poll, PollStatus, StoreId};
use crate::timezone::TimezoneTable;

#[derive(Debug, Deserialize)]
struct PollRow {
    store_id: String,
    status: String,
    timestamp_utc: String,
}

#[derive(Debug, Deserialize)]
struct HoursRow {
    store_id: String,
    #[serde(rename = "dayOfWeek", alias = "day_of_week", alias = "day")]
    day_of_week: i64,
    start_time_local: String,
    end_time_local: String,
}

#[derive(Debug, Deserialize)]
struct TimezoneRow {
    store_id: String,
    timezone_str: Option<String>,
}

/// Snapshot of all input tables
#[derive(Debug, Clone)]
pub struct Dataset {
    polls: HashMap<StoreId, Vec<Poll>>,
    store_order: Vec<StoreId>,
    reference: Option<DateTime<Utc>>,
    pub hours: BusinessHoursTable,
    pub timezones: TimezoneTable,
}

impl Dataset {
    /// Group polls per store (sorted by timestamp) and remember the order in
    /// which stores first appear.
    pub fn from_parts(
        polls: Vec<(StoreId, Poll)>,
        hours: BusinessHoursTable,
        timezones: TimezoneTable,
    ) -> Self {
        let mut grouped: HashMap<StoreId, Vec<Poll>> = HashMap::new();
        let mut store_order = Vec::new();
        let mut reference: Option<DateTime<Utc>> = None;

        for (store_id, poll) in polls {
            reference = Some(reference.map_or(poll.timestamp, |r| r.max(poll.timestamp)));
            grouped
                .entry(store_id)
                .or_insert_with_key(|key| {
                    store_order.push(key.clone());
                    Vec::new()
                })
                .push(poll);
        }

        for store_polls in grouped.values_mut() {
            store_polls.sort_by_key(|p| p.timestamp);
        }

        Self {
            polls: grouped,
            store_order,
            reference,
            hours,
            timezones,
        }
    }

    /// Poll-bearing stores in first-appearance order
    pub fn stores(&self) -> &[StoreId] {
        &self.store_order
    }

    /// A store's polls, sorted ascending
    pub fn polls_for(&self, store_id: &str) -> &[Poll] {
        self.polls.get(store_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn poll_count(&self) -> usize {
        self.polls.values().map(Vec::len).sum()
    }

    /// Latest poll timestamp across every store
    pub fn reference_instant(&self) -> Option<DateTime<Utc>> {
        self.reference
    }
}

/// Parse a poll timestamp.
/// Accepts `YYYY-MM-DD HH:MM:SS[.ffffff][ UTC]` and RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ReportError> {
    let trimmed = value.trim();
    let bare = trimmed.strip_suffix("UTC").unwrap_or(trimmed).trim_end();

    if let Ok(naive) = NaiveDateTime::parse_from_str(bare, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ReportError::InvalidTimestamp(value.to_string()))
}

/// Read the poll table (`store_id, status, timestamp_utc`)
pub fn read_polls<R: Read>(reader: R) -> Result<Vec<(StoreId, Poll)>, ReportError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut polls = Vec::new();
    for row in csv_reader.deserialize::<PollRow>() {
        let row = row?;
        let status: PollStatus = row.status.parse()?;
        let timestamp = parse_timestamp(&row.timestamp_utc)?;
        polls.push((row.store_id, Poll::new(timestamp, status)));
    }
    Ok(polls)
}

/// Read the business-hours table (`store_id, dayOfWeek, start_time_local, end_time_local`)
pub fn read_business_hours<R: Read>(reader: R) -> Result<BusinessHoursTable, ReportError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut table = BusinessHoursTable::new();
    for row in csv_reader.deserialize::<HoursRow>() {
        let row = row?;
        table.insert(BusinessHourRule {
            store_id: row.store_id,
            day_of_week: row.day_of_week,
            start_time_local: row.start_time_local,
            end_time_local: row.end_time_local,
        });
    }
    Ok(table)
}

/// Read the timezone table (`store_id, timezone_str`)
pub fn read_timezones<R: Read>(reader: R, default_zone: &str) -> Result<TimezoneTable, ReportError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut table = TimezoneTable::new(default_zone);
    for row in csv_reader.deserialize::<TimezoneRow>() {
        let row = row?;
        if let Some(zone) = row.timezone_str {
            table.insert(row.store_id, zone);
        }
    }
    Ok(table)
}

/// Load all three tables from disk
pub fn load_dataset(
    polls_path: &Path,
    hours_path: &Path,
    timezones_path: &Path,
    default_zone: &str,
) -> Result<Dataset> {
    let open = |path: &Path| {
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))
    };

    let polls = read_polls(open(polls_path)?)
        .with_context(|| format!("Failed to read polls from {}", polls_path.display()))?;
    let hours = read_business_hours(open(hours_path)?)
        .with_context(|| format!("Failed to read business hours from {}", hours_path.display()))?;
    let timezones = read_timezones(open(timezones_path)?, default_zone)
        .with_context(|| format!("Failed to read timezones from {}", timezones_path.display()))?;

    let dataset = Dataset::from_parts(polls, hours, timezones);
    info!(
        "Loaded {} polls for {} stores ({} with business hours, {} with timezones)",
        dataset.poll_count(),
        dataset.stores().len(),
        dataset.hours.store_count(),
        dataset.timezones.len()
    );
    Ok(dataset)
}
