//! Data types produced by the pipelines.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::config::AnalysisConfig;
use crate::ingest::{CleaningSummary, StationCollision, StationDirectory};

/// Weekday/weekend classification of a ride's start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DayType {
    Weekday,
    Weekend,
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayType::Weekday => f.write_str("Weekday"),
            DayType::Weekend => f.write_str("Weekend"),
        }
    }
}

/// Ride count for one hour of the day at one station, per day type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyBucket {
    pub station_key: String,
    pub day_type: DayType,
    pub hour_of_day: u32,
    pub ride_count: u64,
}

/// Busiest hour for a (station, day type) pair. One CSV row in `peak_hours.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakHour {
    pub station_key: String,
    pub station_name: String,
    pub day_type: DayType,
    pub peak_hour: u32,
    pub ride_count: u64,
}

impl From<HourlyBucket> for PeakHour {
    fn from(bucket: HourlyBucket) -> Self {
        PeakHour {
            station_name: bucket.station_key.clone(),
            station_key: bucket.station_key,
            day_type: bucket.day_type,
            peak_hour: bucket.hour_of_day,
            ride_count: bucket.ride_count,
        }
    }
}

impl PeakHour {
    /// Replace the key-derived label with the station's most common raw name.
    pub fn with_station_name(mut self, stations: &StationDirectory) -> Self {
        self.station_name = stations.display_name(&self.station_key);
        self
    }
}

/// Total rides for one station in one calendar year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearlyBucket {
    pub station_key: String,
    pub year: i32,
    pub total_rides: u64,
}

/// Year-over-year change for one station-year.
///
/// The `previous_*` and change fields are `None` for a station's first
/// recorded year: there is no baseline, which is not the same as no change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YoyRecord {
    pub station_key: String,
    pub station_name: String,
    pub year: i32,
    pub total_rides: u64,
    pub previous_year: Option<i32>,
    pub previous_total: Option<u64>,
    pub absolute_change: Option<i64>,
    pub percent_change: Option<f64>,
}

impl YoyRecord {
    pub fn with_station_name(mut self, stations: &StationDirectory) -> Self {
        self.station_name = stations.display_name(&self.station_key);
        self
    }
}

/// Ranked growth and decline station-years.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendReport {
    pub growth: Vec<YoyRecord>,
    pub decline: Vec<YoyRecord>,
}

/// Everything one run produces, written as `report.json`.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub config: AnalysisConfig,
    pub target_year: Option<i32>,
    pub cleaning: CleaningSummary,
    pub peak_hours: Vec<PeakHour>,
    pub trend: TrendReport,
    pub station_collisions: Vec<StationCollision>,
}
