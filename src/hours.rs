/// Business hours resolution
/// Turns raw weekly rules into a per-weekday local open window
///
/// Day-of-week convention: 0 = Monday .. 6 = Sunday, the same numbering as
/// `chrono::Weekday::num_days_from_monday`.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::collections::HashMap;

use crate::error::ReportError;
use crate::model::StoreId;

/// One raw business-hours row, exactly as ingested.
/// Times stay unparsed until the store is resolved so that a malformed row
/// fails the report that touches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessHourRule {
    pub store_id: StoreId,
    pub day_of_week: i64,
    pub start_time_local: String,
    pub end_time_local: String,
}

/// Local opening window for one weekday
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayWindow {
    Closed,
    /// Open from `open` until `close` on the same local date.
    /// A `close` not after `open` yields an empty window.
    Open { open: NaiveTime, close: NaiveTime },
    /// Open for the whole local date, midnight to next midnight
    AllDay,
}

impl DayWindow {
    /// Local start/end of this window on `date`, or None when closed
    pub fn bounds_on(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match *self {
            DayWindow::Closed => None,
            DayWindow::Open { open, close } => Some((date.and_time(open), date.and_time(close))),
            DayWindow::AllDay => {
                let start = date.and_hms_opt(0, 0, 0)?;
                Some((start, start + Duration::days(1)))
            }
        }
    }
}

/// Weekly schedule indexed Monday-first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklySchedule {
    days: [DayWindow; 7],
}

impl WeeklySchedule {
    /// Schedule used for stores without any rule
    pub fn always_open() -> Self {
        Self {
            days: [DayWindow::AllDay; 7],
        }
    }

    pub fn closed() -> Self {
        Self {
            days: [DayWindow::Closed; 7],
        }
    }

    pub fn set(&mut self, weekday: Weekday, window: DayWindow) {
        self.days[weekday.num_days_from_monday() as usize] = window;
    }

    pub fn day(&self, weekday: Weekday) -> DayWindow {
        self.days[weekday.num_days_from_monday() as usize]
    }

    /// Window in effect on a local calendar date
    pub fn on_date(&self, date: NaiveDate) -> DayWindow {
        self.day(date.weekday())
    }
}

/// Parse a zero-padded 24-hour `HH:MM` local time-of-day.
/// Anything else, seconds included, is rejected.
pub fn parse_time_of_day(store_id: &str, value: &str) -> Result<NaiveTime, ReportError> {
    let invalid = || ReportError::InvalidTime {
        store_id: store_id.to_string(),
        value: value.to_string(),
    };

    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
    if !well_formed {
        return Err(invalid());
    }
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| invalid())
}

fn weekday_from_index(store_id: &str, index: i64) -> Result<Weekday, ReportError> {
    match index {
        0 => Ok(Weekday::Mon),
        1 => Ok(Weekday::Tue),
        2 => Ok(Weekday::Wed),
        3 => Ok(Weekday::Thu),
        4 => Ok(Weekday::Fri),
        5 => Ok(Weekday::Sat),
        6 => Ok(Weekday::Sun),
        _ => Err(ReportError::InvalidDayOfWeek {
            store_id: store_id.to_string(),
            value: index,
        }),
    }
}

/// All business-hour rules, grouped per store in file order
#[derive(Debug, Clone, Default)]
pub struct BusinessHoursTable {
    rules: HashMap<StoreId, Vec<BusinessHourRule>>,
}

impl BusinessHoursTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rule: BusinessHourRule) {
        self.rules.entry(rule.store_id.clone()).or_default().push(rule);
    }

    /// Number of stores with at least one rule
    pub fn store_count(&self) -> usize {
        self.rules.len()
    }

    /// Resolve a store's weekly schedule.
    ///
    /// No rules at all means open around the clock. Otherwise days without a
    /// rule are closed and, when a day has several rules, the last one read
    /// replaces the earlier ones; windows are not merged.
    pub fn resolve_hours(&self, store_id: &str) -> Result<WeeklySchedule, ReportError> {
        let rules = match self.rules.get(store_id) {
            Some(rules) if !rules.is_empty() => rules,
            _ => return Ok(WeeklySchedule::always_open()),
        };

        let mut schedule = WeeklySchedule::closed();
        for rule in rules {
            let weekday = weekday_from_index(store_id, rule.day_of_week)?;
            let open = parse_time_of_day(store_id, &rule.start_time_local)?;
            let close = parse_time_of_day(store_id, &rule.end_time_local)?;
            schedule.set(weekday, DayWindow::Open { open, close });
        }
        Ok(schedule)
    }
}
