/// Timezone resolution
/// Maps stores to IANA zone names and converts local wall-clock times to UTC

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;

use crate::error::ReportError;
use crate::model::StoreId;

pub const DEFAULT_TIMEZONE: &str = "America/Chicago";

/// Store → timezone name lookup with a fixed fallback
#[derive(Debug, Clone)]
pub struct TimezoneTable {
    zones: HashMap<StoreId, String>,
    default_zone: String,
}

impl TimezoneTable {
    pub fn new(default_zone: impl Into<String>) -> Self {
        Self {
            zones: HashMap::new(),
            default_zone: default_zone.into(),
        }
    }

    /// Record a store's zone. Later entries for the same store win.
    pub fn insert(&mut self, store_id: impl Into<StoreId>, zone: impl Into<String>) {
        self.zones.insert(store_id.into(), zone.into());
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Declared zone name, or the default when absent or blank. Never fails.
    pub fn resolve_timezone(&self, store_id: &str) -> &str {
        match self.zones.get(store_id) {
            Some(zone) if !zone.trim().is_empty() => zone.trim(),
            _ => &self.default_zone,
        }
    }
}

/// Parse an IANA zone name
pub fn parse_timezone(name: &str) -> Result<Tz, ReportError> {
    name.parse::<Tz>()
        .map_err(|_| ReportError::InvalidTimezone(name.to_string()))
}

/// Convert a local wall-clock time in `tz` to an absolute instant.
///
/// Ambiguous times (clocks falling back) take the earlier instant. Times
/// inside a spring-forward gap are shifted using the offset that was in
/// effect before the transition.
pub fn localize(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let before = tz
                .offset_from_utc_datetime(&(local - Duration::days(1)))
                .fix();
            let utc = local - Duration::seconds(before.local_minus_utc() as i64);
            Utc.from_utc_datetime(&utc)
        }
    }
}
