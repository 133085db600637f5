//! Ingest & clean stage shared by both pipelines.
//!
//! Raw CSV rows are read as [`TripRecord`]s with every field kept as optional
//! text, so a malformed value only drops its own row. [`clean_trips`] turns
//! them into [`CleanedTrip`]s, counting each rejection in a [`CleaningSummary`]
//! and recording raw station spellings in a [`StationDirectory`].

pub mod stations;
mod timestamp;

pub use stations::{StationCollision, StationDirectory};
pub use timestamp::parse_timestamp;

use anyhow::{Result, bail};
use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;
use std::io::Read;
use tracing::{debug, info};

use crate::config::AnalysisConfig;

const REQUIRED_COLUMNS: &[&str] = &["start_station_name", "start_time", "duration_minutes"];

/// A single row of the trip dataset, before any validation.
#[derive(Debug, Clone, Default)]
pub struct TripRecord {
    pub start_station_name: Option<String>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<String>,
}

/// A trip that passed cleaning, reduced to what the pipelines group on.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTrip {
    pub station_key: String,
    pub start: NaiveDateTime,
    pub year: i32,
    pub day_of_week: Weekday,
    pub hour_of_day: u32,
    pub duration_minutes: f64,
}

/// Why a record was left out of aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingStation,
    MalformedTimestamp,
    MalformedDuration,
    DurationOutOfRange,
}

/// Per-run data-quality counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningSummary {
    pub total: usize,
    pub kept: usize,
    pub missing_station: usize,
    pub malformed_timestamp: usize,
    pub malformed_duration: usize,
    pub duration_out_of_range: usize,
}

impl CleaningSummary {
    fn reject(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::MissingStation => self.missing_station += 1,
            RejectReason::MalformedTimestamp => self.malformed_timestamp += 1,
            RejectReason::MalformedDuration => self.malformed_duration += 1,
            RejectReason::DurationOutOfRange => self.duration_out_of_range += 1,
        }
    }

    pub fn rejected(&self) -> usize {
        self.total - self.kept
    }
}

/// Output of the cleaning stage, shared read-only by both pipelines.
#[derive(Debug, Default)]
pub struct CleanedDataset {
    pub trips: Vec<CleanedTrip>,
    pub summary: CleaningSummary,
    pub stations: StationDirectory,
}

/// Normalizes a raw station name into its canonical key: lower-cased, with
/// every character outside `[a-z0-9]` removed.
pub fn canonicalize(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Reads trip records from CSV. Fails only on unreadable input or when a
/// required column is absent from the header. Field bytes that are not valid
/// UTF-8 are decoded lossily so one badly encoded row cannot sink the run.
pub fn read_trips<R: Read>(reader: R) -> Result<Vec<TripRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut columns = [0usize; 3];
    for (slot, column) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        match headers.iter().position(|h| h == *column) {
            Some(idx) => *slot = idx,
            None => bail!("trip dataset is missing required column '{column}'"),
        }
    }
    let [station_col, start_col, duration_col] = columns;

    let field = |row: &csv::ByteRecord, idx: usize| -> Option<String> {
        row.get(idx)
            .filter(|bytes| !bytes.is_empty())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    };

    let mut records = Vec::new();
    let mut lossy_rows = 0usize;
    for result in rdr.byte_records() {
        let row = result?;
        if std::str::from_utf8(row.as_slice()).is_err() {
            lossy_rows += 1;
        }
        records.push(TripRecord {
            start_station_name: field(&row, station_col),
            start_time: field(&row, start_col),
            duration_minutes: field(&row, duration_col),
        });
    }

    if lossy_rows > 0 {
        debug!(lossy_rows, "Rows with invalid UTF-8 decoded lossily");
    }
    debug!(rows = records.len(), "Trip records read");
    Ok(records)
}

/// Validates a single record against the configured bounds.
pub fn clean_record(
    record: &TripRecord,
    config: &AnalysisConfig,
) -> std::result::Result<CleanedTrip, RejectReason> {
    let raw_name = record
        .start_station_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(RejectReason::MissingStation)?;
    let station_key = canonicalize(raw_name);
    if station_key.is_empty() {
        return Err(RejectReason::MissingStation);
    }

    let start = record
        .start_time
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or(RejectReason::MalformedTimestamp)?;

    let duration_minutes = record
        .duration_minutes
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .ok_or(RejectReason::MalformedDuration)?;

    if !config.duration_in_bounds(duration_minutes) {
        return Err(RejectReason::DurationOutOfRange);
    }

    Ok(CleanedTrip {
        station_key,
        start,
        year: start.year(),
        day_of_week: start.weekday(),
        hour_of_day: start.hour(),
        duration_minutes,
    })
}

/// Runs the cleaning stage over every record.
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn clean_trips(records: &[TripRecord], config: &AnalysisConfig) -> CleanedDataset {
    let mut dataset = CleanedDataset::default();

    for record in records {
        dataset.summary.total += 1;
        match clean_record(record, config) {
            Ok(trip) => {
                if let Some(raw_name) = record.start_station_name.as_deref() {
                    dataset.stations.record(&trip.station_key, raw_name);
                }
                dataset.summary.kept += 1;
                dataset.trips.push(trip);
            }
            Err(reason) => dataset.summary.reject(reason),
        }
    }

    let s = &dataset.summary;
    info!(
        total = s.total,
        kept = s.kept,
        missing_station = s.missing_station,
        malformed_timestamp = s.malformed_timestamp,
        malformed_duration = s.malformed_duration,
        duration_out_of_range = s.duration_out_of_range,
        stations = dataset.stations.len(),
        "Cleaning complete"
    );

    dataset
}

/// The most recent calendar year the trips fully cover: the year of the latest
/// trip if it falls on December 31st, otherwise the year before it.
pub fn latest_complete_year(trips: &[CleanedTrip]) -> Option<i32> {
    let latest = trips.iter().map(|t| t.start).max()?;
    if latest.month() == 12 && latest.day() == 31 {
        Some(latest.year())
    } else {
        Some(latest.year() - 1)
    }
}
