//! Peak-usage pipeline: busiest hour per station and day type.

use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::analyzers::types::{DayType, HourlyBucket, PeakHour};
use crate::analyzers::utility::dense_rank_desc;
use crate::config::AnalysisConfig;
use crate::ingest::{CleanedDataset, CleanedTrip};

/// Counts rides per `(station, day type, hour)` for trips started in `year`.
/// Buckets come back ordered by station, day type, then hour.
pub fn hourly_buckets(
    trips: &[CleanedTrip],
    year: i32,
    config: &AnalysisConfig,
) -> Vec<HourlyBucket> {
    let mut counts: HashMap<(&str, DayType, u32), u64> = HashMap::new();

    for trip in trips.iter().filter(|t| t.year == year) {
        let day_type = config.day_type(trip.day_of_week);
        *counts
            .entry((trip.station_key.as_str(), day_type, trip.hour_of_day))
            .or_default() += 1;
    }

    let mut buckets: Vec<HourlyBucket> = counts
        .into_iter()
        .map(|((station_key, day_type, hour_of_day), ride_count)| HourlyBucket {
            station_key: station_key.to_string(),
            day_type,
            hour_of_day,
            ride_count,
        })
        .collect();
    buckets.sort_by(|a, b| {
        (&a.station_key, a.day_type, a.hour_of_day).cmp(&(&b.station_key, b.day_type, b.hour_of_day))
    });
    buckets
}

/// Keeps the rank-1 buckets of every `(station, day type)` group. Hours tied
/// for the top count all survive.
pub fn select_peaks(buckets: &[HourlyBucket]) -> Vec<HourlyBucket> {
    let mut groups: BTreeMap<(&str, DayType), Vec<&HourlyBucket>> = BTreeMap::new();
    for bucket in buckets {
        groups
            .entry((bucket.station_key.as_str(), bucket.day_type))
            .or_default()
            .push(bucket);
    }

    let mut peaks = Vec::new();
    for group in groups.values() {
        let counts: Vec<u64> = group.iter().map(|b| b.ride_count).collect();
        let ranks = dense_rank_desc(&counts);
        peaks.extend(
            group
                .iter()
                .zip(ranks)
                .filter(|(_, rank)| *rank == 1)
                .map(|(bucket, _)| (*bucket).clone()),
        );
    }
    peaks
}

/// Orders peaks by ride count, busiest first, and keeps the first `n`.
/// Equal counts fall back to station, day type and hour so output is stable.
pub fn top_peaks(mut peaks: Vec<HourlyBucket>, n: usize) -> Vec<HourlyBucket> {
    peaks.sort_by(|a, b| {
        b.ride_count
            .cmp(&a.ride_count)
            .then_with(|| a.station_key.cmp(&b.station_key))
            .then_with(|| a.day_type.cmp(&b.day_type))
            .then_with(|| a.hour_of_day.cmp(&b.hour_of_day))
    });
    peaks.truncate(n);
    peaks
}

/// Runs the whole pipeline over a cleaned dataset for the given year.
#[tracing::instrument(skip(dataset, config), fields(trips = dataset.trips.len()))]
pub fn peak_hours(dataset: &CleanedDataset, year: i32, config: &AnalysisConfig) -> Vec<PeakHour> {
    let buckets = hourly_buckets(&dataset.trips, year, config);
    let peaks = select_peaks(&buckets);
    let candidates = peaks.len();

    let top: Vec<PeakHour> = top_peaks(peaks, config.peak_top_n)
        .into_iter()
        .map(|bucket| PeakHour::from(bucket).with_station_name(&dataset.stations))
        .collect();

    info!(
        buckets = buckets.len(),
        candidates,
        reported = top.len(),
        "Peak-usage pipeline complete"
    );
    top
}
