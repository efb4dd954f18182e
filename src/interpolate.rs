//! Uptime/downtime interpolation
//!
//! Polls are sparse, so status between two observations is assumed to be the
//! status of the earlier one (last observation carried forward). Only the
//! parts of each trailing window that fall inside the store's local business
//! hours are counted.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::error::ReportError;
use crate::hours::WeeklySchedule;
use crate::model::{Poll, PollStatus, StoreMetrics, Window};
use crate::timezone::{localize, parse_timezone};

/// Time attributed to each status within one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UptimeTotals {
    pub uptime: Duration,
    pub downtime: Duration,
}

impl Default for UptimeTotals {
    fn default() -> Self {
        Self {
            uptime: Duration::zero(),
            downtime: Duration::zero(),
        }
    }
}

impl UptimeTotals {
    fn add(&mut self, status: PollStatus, elapsed: Duration) {
        match status {
            PollStatus::Active => self.uptime = self.uptime + elapsed,
            PollStatus::Inactive => self.downtime = self.downtime + elapsed,
        }
    }

    pub fn total(&self) -> Duration {
        self.uptime + self.downtime
    }

    /// Whole minutes, truncated. Downtime is the whole minutes of the
    /// accounted span minus uptime so the pair always sums to the span.
    pub fn minutes(&self) -> (i64, i64) {
        let uptime = self.uptime.num_minutes();
        (uptime, self.total().num_minutes() - uptime)
    }

    /// Hours rounded to two decimals, split the same way as `minutes`
    pub fn hours(&self) -> (f64, f64) {
        let uptime = round_hours(self.uptime);
        let downtime = ((round_hours(self.total()) - uptime) * 100.0).round() / 100.0;
        (uptime, downtime)
    }
}

fn round_hours(d: Duration) -> f64 {
    let hours = d.num_milliseconds() as f64 / 3_600_000.0;
    (hours * 100.0).round() / 100.0
}

/// Compute all three windows for one store.
///
/// `polls` must be sorted by timestamp ascending. `reference` is the same
/// instant for every store in a report.
pub fn compute_metrics(
    store_id: &str,
    schedule: &WeeklySchedule,
    timezone_name: &str,
    polls: &[Poll],
    reference: DateTime<Utc>,
) -> Result<StoreMetrics, ReportError> {
    let tz = parse_timezone(timezone_name)?;

    let (uptime_last_hour, downtime_last_hour) =
        window_totals(schedule, tz, polls, reference, Window::LastHour).minutes();
    let (uptime_last_day, downtime_last_day) =
        window_totals(schedule, tz, polls, reference, Window::LastDay).hours();
    let (uptime_last_week, downtime_last_week) =
        window_totals(schedule, tz, polls, reference, Window::LastWeek).hours();

    Ok(StoreMetrics {
        store_id: store_id.to_string(),
        uptime_last_hour,
        uptime_last_day,
        uptime_last_week,
        downtime_last_hour,
        downtime_last_day,
        downtime_last_week,
    })
}

/// Uptime and downtime inside `[reference - window, reference]`, clipped to
/// business hours.
///
/// The window is walked one local calendar date at a time. Each open date is
/// intersected with the window bounds, so the first and last dates only count
/// the part of their opening hours that lies inside the window.
pub fn window_totals(
    schedule: &WeeklySchedule,
    tz: Tz,
    polls: &[Poll],
    reference: DateTime<Utc>,
    window: Window,
) -> UptimeTotals {
    debug_assert!(polls.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let end = reference;
    let start = reference - window.length();
    let first_date = start.with_timezone(&tz).date_naive();
    let last_date = end.with_timezone(&tz).date_naive();

    let mut totals = UptimeTotals::default();
    for date in first_date.iter_days().take_while(|d| *d <= last_date) {
        let Some((open, close)) = schedule.on_date(date).bounds_on(date) else {
            continue;
        };

        let slice_start = localize(tz, open).max(start);
        let slice_end = localize(tz, close).min(end);
        if slice_start >= slice_end {
            continue;
        }

        accumulate_slice(polls, slice_start, slice_end, &mut totals);
    }
    totals
}

/// Attribute `[slice_start, slice_end)` to statuses.
///
/// Boundary points are the slice start, every poll inside the slice, and the
/// slice end. Each gap takes the status in effect at its start; before the
/// first poll that is the last poll strictly before the slice, or inactive
/// when there is none.
fn accumulate_slice(
    polls: &[Poll],
    slice_start: DateTime<Utc>,
    slice_end: DateTime<Utc>,
    totals: &mut UptimeTotals,
) {
    let lo = polls.partition_point(|p| p.timestamp < slice_start);
    let hi = polls.partition_point(|p| p.timestamp < slice_end);

    let mut status = match lo {
        0 => PollStatus::Inactive,
        _ => polls[lo - 1].status,
    };
    let mut cursor = slice_start;

    for poll in &polls[lo..hi] {
        totals.add(status, poll.timestamp - cursor);
        cursor = poll.timestamp;
        status = poll.status;
    }
    totals.add(status, slice_end - cursor);
}
