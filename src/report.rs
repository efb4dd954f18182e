/// Report assembly
/// Runs the interpolator for every poll-bearing store and writes the CSV artifact

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ReportError;
use crate::ingest::Dataset;
use crate::interpolate::compute_metrics;
use crate::model::{StoreMetrics, REPORT_HEADER};

/// Compute metrics for every store that has polls.
///
/// Rows follow the order in which stores first appear in the poll table.
/// The first failing store aborts the whole report.
pub fn build_report(dataset: &Dataset) -> Result<Vec<StoreMetrics>, ReportError> {
    let reference = dataset.reference_instant().ok_or(ReportError::EmptyDataset)?;
    info!("Building report for {} stores, reference instant {}", dataset.stores().len(), reference);

    let mut rows = Vec::with_capacity(dataset.stores().len());
    for store_id in dataset.stores() {
        let timezone = dataset.timezones.resolve_timezone(store_id);
        let schedule = dataset.hours.resolve_hours(store_id)?;
        let polls = dataset.polls_for(store_id);

        let metrics = compute_metrics(store_id, &schedule, timezone, polls, reference)?;
        debug!(
            "Store {} ({}): up {}m/{}h/{}h, down {}m/{}h/{}h",
            store_id,
            timezone,
            metrics.uptime_last_hour,
            metrics.uptime_last_day,
            metrics.uptime_last_week,
            metrics.downtime_last_hour,
            metrics.downtime_last_day,
            metrics.downtime_last_week
        );
        rows.push(metrics);
    }
    Ok(rows)
}

/// Serialize rows with the fixed header
pub fn write_report<W: Write>(rows: &[StoreMetrics], writer: W) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(REPORT_HEADER)?;
    for row in rows {
        csv_writer.write_record(row.to_record())?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Build the report and write it to `path`, creating parent directories.
///
/// Output is written to a temporary sibling first and renamed into place, so a
/// failed report never leaves a partial artifact behind.
pub fn generate_report_file(dataset: &Dataset, path: &Path) -> Result<usize, ReportError> {
    let rows = build_report(dataset)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("csv.tmp");
    let written = File::create(&tmp_path)
        .map_err(ReportError::from)
        .and_then(|file| write_report(&rows, file))
        .and_then(|()| fs::rename(&tmp_path, path).map_err(ReportError::from));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    info!("Report with {} rows written to {}", rows.len(), path.display());
    Ok(rows.len())
}
