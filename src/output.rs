//! Output formatting and persistence for analysis results.
//!
//! Result sets are logged for the operator and written as CSV tables plus a
//! single JSON report for downstream reporting tools.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::types::{AnalysisReport, PeakHour, TrendReport, YoyRecord};

pub const PEAK_HOURS_FILE: &str = "peak_hours.csv";
pub const TREND_GROWTH_FILE: &str = "trend_growth.csv";
pub const TREND_DECLINE_FILE: &str = "trend_decline.csv";
pub const REPORT_FILE: &str = "report.json";

const PEAK_HEADERS: &[&str] = &["station_key", "station_name", "day_type", "peak_hour", "ride_count"];

const TREND_HEADERS: &[&str] = &[
    "station_key",
    "station_name",
    "year",
    "total_rides",
    "previous_year",
    "previous_total",
    "absolute_change",
    "percent_change",
];

/// Logs any value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn log_peak_hours(peaks: &[PeakHour]) {
    for (rank, peak) in peaks.iter().enumerate() {
        info!(
            rank = rank + 1,
            station = %peak.station_name,
            day_type = %peak.day_type,
            peak_hour = peak.peak_hour,
            ride_count = peak.ride_count,
            "Peak hour"
        );
    }
}

fn log_yoy(kind: &str, records: &[YoyRecord]) {
    for (rank, r) in records.iter().enumerate() {
        info!(
            kind,
            rank = rank + 1,
            station = %r.station_name,
            year = r.year,
            total_rides = r.total_rides,
            previous_total = ?r.previous_total,
            absolute_change = ?r.absolute_change,
            percent_change = ?r.percent_change.map(|p| (p * 100.0).round() / 100.0),
            "Year-over-year change"
        );
    }
}

pub fn log_trend(trend: &TrendReport) {
    log_yoy("growth", &trend.growth);
    log_yoy("decline", &trend.decline);
}

/// Writes `rows` to a fresh CSV file at `path`. The header row is always
/// written, so an empty result set still yields a valid table.
pub fn write_csv<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = rows.len(), "CSV written");
    Ok(())
}

pub fn write_peak_hours(output_dir: &Path, peaks: &[PeakHour]) -> Result<PathBuf> {
    let path = output_dir.join(PEAK_HOURS_FILE);
    write_csv(&path, PEAK_HEADERS, peaks)?;
    Ok(path)
}

pub fn write_trend(output_dir: &Path, trend: &TrendReport) -> Result<Vec<PathBuf>> {
    let growth = output_dir.join(TREND_GROWTH_FILE);
    write_csv(&growth, TREND_HEADERS, &trend.growth)?;
    let decline = output_dir.join(TREND_DECLINE_FILE);
    write_csv(&decline, TREND_HEADERS, &trend.decline)?;
    Ok(vec![growth, decline])
}

pub fn write_report_json(output_dir: &Path, report: &AnalysisReport) -> Result<PathBuf> {
    let path = output_dir.join(REPORT_FILE);
    let file = File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    info!(path = %path.display(), "Report written");
    Ok(path)
}
