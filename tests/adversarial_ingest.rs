//! Adversarial Property-Based Tests for Input Tables and Report Assembly
//!
//! # Attack Plan
//!
//! 1. **Timestamp Attacks**: truncated dates, out-of-range fields, odd
//!    suffixes, unicode digits, arbitrary text.
//!
//! 2. **Time-of-Day Attacks**: 24:00, negative values, seconds overflow,
//!    whitespace, empty strings.
//!
//! 3. **CSV Structure**: missing columns, extra columns, quoted fields,
//!    ragged rows.
//!
//! 4. **Report Invariants**: random poll histories for stores open around the
//!    clock must account for every minute of each window.
//!
//! # Invariants
//!
//! - parse_timestamp / read_* never panic (may return Err)
//! - resolve_hours never panics on arbitrary row contents
//! - build_report rows are in first-appearance order and deterministic
//! - 24/7 stores: uptime + downtime equals the window length

use proptest::prelude::*;

use store_uptime::hours::{BusinessHourRule, BusinessHoursTable};
use store_uptime::ingest::{parse_timestamp, read_business_hours, read_polls, read_timezones, Dataset};
use store_uptime::model::{Poll, PollStatus};
use store_uptime::report::build_report;
use store_uptime::timezone::TimezoneTable;

use chrono::{Duration, TimeZone, Utc};

// ============================================================================
// ADVERSARIAL GENERATORS
// ============================================================================

fn malformed_timestamp() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("".to_string()),
        Just("2023-01-22".to_string()),
        Just("2023-01-22 25:00:00 UTC".to_string()),
        Just("2023-02-30 12:00:00 UTC".to_string()),
        Just("2023-01-22 12:00:00 PST".to_string()),
        Just("2023-01-22 12:00:00.9999999999999 UTC".to_string()),
        Just("２０２３-01-22 12:00:00 UTC".to_string()),
        Just("0000-00-00 00:00:00".to_string()),
        Just("+99999-01-01T00:00:00Z".to_string()),
        ".*",
    ]
}

fn malformed_time_of_day() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("24:00".to_string()),
        Just("-1:00".to_string()),
        Just("12:60".to_string()),
        Just("12:00:61".to_string()),
        Just("   ".to_string()),
        Just("".to_string()),
        Just("12:00 PM".to_string()),
        Just("１２:００".to_string()),
        ".*",
    ]
}

fn malformed_csv() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("".to_string()),
        Just("store_id\n1\n".to_string()),
        Just("store_id,status,timestamp_utc\n1,active\n".to_string()),
        Just("store_id,status,timestamp_utc\n1,active,2023-01-01 00:00:00,extra\n".to_string()),
        Just("store_id,status,timestamp_utc\n\"1,2\",active,2023-01-01 00:00:00\n".to_string()),
        Just("store_id,dayOfWeek,start_time_local,end_time_local\n1,x,09:00,17:00\n".to_string()),
        Just("store_id,timezone_str\n1,\"unterminated\n".to_string()),
        ".*",
    ]
}

// ============================================================================
// INVARIANT: PARSERS NEVER PANIC
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_parse_timestamp_never_panics(value in malformed_timestamp()) {
        let _ = parse_timestamp(&value);
    }

    #[test]
    fn prop_readers_never_panic(csv in malformed_csv()) {
        let _ = read_polls(csv.as_bytes());
        let _ = read_business_hours(csv.as_bytes());
        let _ = read_timezones(csv.as_bytes(), "America/Chicago");
    }

    #[test]
    fn prop_resolve_hours_never_panics(
        day in any::<i64>(),
        start in malformed_time_of_day(),
        end in malformed_time_of_day(),
    ) {
        let mut table = BusinessHoursTable::new();
        table.insert(BusinessHourRule {
            store_id: "1".to_string(),
            day_of_week: day,
            start_time_local: start,
            end_time_local: end,
        });
        let _ = table.resolve_hours("1");
    }
}

// ============================================================================
// INVARIANT: 24/7 STORES ACCOUNT FOR THE WHOLE WINDOW
// ============================================================================

fn poll_history() -> impl Strategy<Value = Vec<(String, Poll)>> {
    let start = Utc.with_ymd_and_hms(2023, 3, 5, 0, 0, 0).unwrap();
    // Millisecond offsets over two weeks, so polls rarely land on whole minutes
    prop::collection::vec((0u8..4, 0i64..1_209_600_000, any::<bool>()), 1..80).prop_map(move |raw| {
        raw.into_iter()
            .map(|(store, millis, active)| {
                let status = if active { PollStatus::Active } else { PollStatus::Inactive };
                (store.to_string(), Poll::new(start + Duration::milliseconds(millis), status))
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_always_open_rows_cover_windows(
        polls in poll_history(),
        zone in prop_oneof![Just("America/Chicago"), Just("Asia/Kolkata"), Just("Europe/Berlin"), Just("UTC")],
    ) {
        let mut timezones = TimezoneTable::new("America/Chicago");
        for store in 0..4 {
            timezones.insert(store.to_string(), zone);
        }
        let dataset = Dataset::from_parts(polls, BusinessHoursTable::new(), timezones);
        let rows = build_report(&dataset).unwrap();

        prop_assert_eq!(rows.len(), dataset.stores().len());
        for (row, store) in rows.iter().zip(dataset.stores()) {
            prop_assert_eq!(&row.store_id, store);
            prop_assert_eq!(row.uptime_last_hour + row.downtime_last_hour, 60);
            prop_assert!((row.uptime_last_day + row.downtime_last_day - 24.0).abs() < 1e-9);
            prop_assert!((row.uptime_last_week + row.downtime_last_week - 168.0).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_report_is_deterministic(polls in poll_history()) {
        let dataset = Dataset::from_parts(polls, BusinessHoursTable::new(), TimezoneTable::new("America/Chicago"));
        prop_assert_eq!(build_report(&dataset).unwrap(), build_report(&dataset).unwrap());
    }
}
