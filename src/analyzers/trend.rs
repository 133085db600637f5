//! Trend pipeline: year-over-year ridership change per station.
//!
//! "Previous year" means the station's previous *recorded* year. A station
//! with rides in 2017 and 2019 but none in 2018 compares 2019 against 2017;
//! missing years are never filled with zeros.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

use crate::analyzers::types::{TrendReport, YearlyBucket, YoyRecord};
use crate::analyzers::utility::pct_change;
use crate::config::AnalysisConfig;
use crate::ingest::{CleanedDataset, CleanedTrip};

/// Station keys with at least `min_total_rides` rides across all years.
pub fn active_stations(trips: &[CleanedTrip], min_total_rides: u64) -> HashSet<&str> {
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for trip in trips {
        *totals.entry(trip.station_key.as_str()).or_default() += 1;
    }
    totals
        .into_iter()
        .filter(|(_, total)| *total >= min_total_rides)
        .map(|(key, _)| key)
        .collect()
}

/// Rides per `(station, year)` for stations passing the activity filter,
/// ordered by station then year.
pub fn yearly_buckets(trips: &[CleanedTrip], min_total_rides: u64) -> Vec<YearlyBucket> {
    let active = active_stations(trips, min_total_rides);

    let mut totals: BTreeMap<(&str, i32), u64> = BTreeMap::new();
    for trip in trips.iter().filter(|t| active.contains(t.station_key.as_str())) {
        *totals
            .entry((trip.station_key.as_str(), trip.year))
            .or_default() += 1;
    }

    totals
        .into_iter()
        .map(|((station_key, year), total_rides)| YearlyBucket {
            station_key: station_key.to_string(),
            year,
            total_rides,
        })
        .collect()
}

/// Computes the change of each station-year against the station's previous
/// recorded year. `buckets` must be ordered by station then year, as returned
/// by [`yearly_buckets`].
pub fn year_over_year(buckets: &[YearlyBucket]) -> Vec<YoyRecord> {
    let mut records = Vec::with_capacity(buckets.len());
    let mut previous: Option<&YearlyBucket> = None;

    for bucket in buckets {
        let prior = previous.filter(|p| p.station_key == bucket.station_key);

        records.push(YoyRecord {
            station_key: bucket.station_key.clone(),
            station_name: bucket.station_key.clone(),
            year: bucket.year,
            total_rides: bucket.total_rides,
            previous_year: prior.map(|p| p.year),
            previous_total: prior.map(|p| p.total_rides),
            absolute_change: prior.map(|p| bucket.total_rides as i64 - p.total_rides as i64),
            percent_change: prior.and_then(|p| pct_change(p.total_rides, bucket.total_rides)),
        });

        previous = Some(bucket);
    }

    records
}

/// Drops records whose previous year does not exceed `min_baseline_rides`.
/// First-year records have no baseline and are dropped too.
pub fn apply_baseline(records: Vec<YoyRecord>, min_baseline_rides: u64) -> Vec<YoyRecord> {
    records
        .into_iter()
        .filter(|r| r.previous_total.is_some_and(|p| p > min_baseline_rides))
        .collect()
}

fn by_station_year(a: &YoyRecord, b: &YoyRecord) -> Ordering {
    a.station_key
        .cmp(&b.station_key)
        .then_with(|| a.year.cmp(&b.year))
}

/// Largest percentage increases first. Records without a percentage sort last.
pub fn top_growth(records: &[YoyRecord], n: usize) -> Vec<YoyRecord> {
    let mut growth: Vec<YoyRecord> = records
        .iter()
        .filter(|r| r.absolute_change.is_some())
        .cloned()
        .collect();
    growth.sort_by(|a, b| {
        let pa = a.percent_change.unwrap_or(f64::NEG_INFINITY);
        let pb = b.percent_change.unwrap_or(f64::NEG_INFINITY);
        pb.total_cmp(&pa).then_with(|| by_station_year(a, b))
    });
    growth.truncate(n);
    growth
}

/// Steepest percentage drops first. Only records with a negative absolute
/// change qualify.
pub fn top_decline(records: &[YoyRecord], n: usize) -> Vec<YoyRecord> {
    let mut decline: Vec<YoyRecord> = records
        .iter()
        .filter(|r| r.absolute_change.is_some_and(|c| c < 0))
        .cloned()
        .collect();
    decline.sort_by(|a, b| {
        let pa = a.percent_change.unwrap_or(f64::INFINITY);
        let pb = b.percent_change.unwrap_or(f64::INFINITY);
        pa.total_cmp(&pb).then_with(|| by_station_year(a, b))
    });
    decline.truncate(n);
    decline
}

/// Runs the whole pipeline over a cleaned dataset (all years).
#[tracing::instrument(skip(dataset, config), fields(trips = dataset.trips.len()))]
pub fn trend_report(dataset: &CleanedDataset, config: &AnalysisConfig) -> TrendReport {
    let buckets = yearly_buckets(&dataset.trips, config.min_total_rides);
    let records = year_over_year(&buckets);
    debug!(
        yearly_buckets = buckets.len(),
        yoy_records = records.len(),
        "Yearly aggregation complete"
    );

    let baselined = apply_baseline(records, config.min_baseline_rides);

    let label = |r: YoyRecord| r.with_station_name(&dataset.stations);
    let report = TrendReport {
        growth: top_growth(&baselined, config.trend_top_n)
            .into_iter()
            .map(label)
            .collect(),
        decline: top_decline(&baselined, config.trend_top_n)
            .into_iter()
            .map(label)
            .collect(),
    };

    info!(
        candidates = baselined.len(),
        growth = report.growth.len(),
        decline = report.decline.len(),
        "Trend pipeline complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{TripRecord, clean_trips};

    fn bucket(key: &str, year: i32, total_rides: u64) -> YearlyBucket {
        YearlyBucket {
            station_key: key.to_string(),
            year,
            total_rides,
        }
    }

    fn rides(name: &str, year: i32, count: usize) -> Vec<TripRecord> {
        (0..count)
            .map(|_| TripRecord {
                start_station_name: Some(name.to_string()),
                start_time: Some(format!("{year}-05-15 09:30:00")),
                duration_minutes: Some("12".to_string()),
            })
            .collect()
    }

    #[test]
    fn test_yoy_change_against_previous_year() {
        let records = year_over_year(&[bucket("b", 2020, 200), bucket("b", 2021, 400)]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].absolute_change, None);
        assert_eq!(records[1].previous_year, Some(2020));
        assert_eq!(records[1].absolute_change, Some(200));
        assert_eq!(records[1].percent_change, Some(100.0));
    }

    #[test]
    fn test_baseline_boundary_is_exclusive() {
        let records = year_over_year(&[bucket("b", 2020, 200), bucket("b", 2021, 400)]);

        assert!(apply_baseline(records.clone(), 200).is_empty());

        let kept = apply_baseline(records, 199);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].year, 2021);
        assert_eq!(kept[0].absolute_change, Some(200));
        assert_eq!(kept[0].percent_change, Some(100.0));
    }

    #[test]
    fn test_first_recorded_year_has_no_baseline() {
        // Station C has no 2019 row at all, only 2020.
        let records = year_over_year(&[bucket("c", 2020, 50)]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].previous_year, None);
        assert_eq!(records[0].absolute_change, None);
        assert_eq!(records[0].percent_change, None);
    }

    #[test]
    fn test_gap_year_compares_to_previous_recorded_year() {
        let records = year_over_year(&[bucket("d", 2017, 300), bucket("d", 2019, 600)]);

        assert_eq!(records[1].previous_year, Some(2017));
        assert_eq!(records[1].absolute_change, Some(300));
        assert_eq!(records[1].percent_change, Some(100.0));
    }

    #[test]
    fn test_changes_do_not_leak_across_stations() {
        let records = year_over_year(&[bucket("a", 2020, 500), bucket("b", 2021, 100)]);
        assert_eq!(records[1].absolute_change, None);
    }

    #[test]
    fn test_zero_previous_total_gives_null_percent() {
        let records = year_over_year(&[bucket("z", 2020, 0), bucket("z", 2021, 10)]);
        assert_eq!(records[1].absolute_change, Some(10));
        assert_eq!(records[1].percent_change, None);
    }

    #[test]
    fn test_activity_filter_removes_station_from_all_years() {
        let config = AnalysisConfig::default();
        let mut records = rides("Quiet Corner", 2018, 4);
        records.extend(rides("Quiet Corner", 2019, 5));
        records.extend(rides("Busy Plaza", 2019, 10));
        let dataset = clean_trips(&records, &config);

        let buckets = yearly_buckets(&dataset.trips, config.min_total_rides);
        assert_eq!(buckets, vec![bucket("busyplaza", 2019, 10)]);
    }

    #[test]
    fn test_growth_and_decline_ordering() {
        let records = year_over_year(&[
            bucket("a", 2018, 1000),
            bucket("a", 2019, 1500),
            bucket("b", 2018, 400),
            bucket("b", 2019, 1200),
            bucket("c", 2018, 800),
            bucket("c", 2019, 400),
            bucket("d", 2018, 1000),
            bucket("d", 2019, 900),
            bucket("e", 2018, 300),
            bucket("e", 2019, 300),
        ]);
        let candidates = apply_baseline(records, 200);

        let growth = top_growth(&candidates, 10);
        let growth_keys: Vec<&str> = growth.iter().map(|r| r.station_key.as_str()).collect();
        assert_eq!(growth_keys, vec!["b", "a", "e", "d", "c"]);
        assert!(
            growth
                .windows(2)
                .all(|w| w[0].percent_change >= w[1].percent_change)
        );

        let decline = top_decline(&candidates, 10);
        let decline_keys: Vec<&str> = decline.iter().map(|r| r.station_key.as_str()).collect();
        assert_eq!(decline_keys, vec!["c", "d"]);
        assert!(decline.iter().all(|r| r.absolute_change.unwrap() < 0));
        assert!(
            decline
                .windows(2)
                .all(|w| w[0].percent_change <= w[1].percent_change)
        );
    }

    #[test]
    fn test_top_n_limits_lists() {
        let records = year_over_year(&[
            bucket("a", 2018, 1000),
            bucket("a", 2019, 100),
            bucket("b", 2018, 1000),
            bucket("b", 2019, 500),
        ]);
        let candidates = apply_baseline(records, 200);

        assert_eq!(top_decline(&candidates, 1).len(), 1);
        assert_eq!(top_decline(&candidates, 1)[0].station_key, "a");
        assert_eq!(top_growth(&candidates, 1)[0].station_key, "b");
    }

    #[test]
    fn test_trend_report_labels_and_filters() {
        let config = AnalysisConfig {
            min_baseline_rides: 5,
            ..Default::default()
        };
        let mut records = rides("Republic Square", 2018, 6);
        records.extend(rides("Republic Square", 2019, 12));
        records.extend(rides("Rainey St @ Cummings", 2018, 10));
        records.extend(rides("Rainey St & Cummings", 2019, 3));
        let dataset = clean_trips(&records, &config);

        let report = trend_report(&dataset, &config);

        assert_eq!(report.growth.len(), 2);
        assert_eq!(report.growth[0].station_name, "Republic Square");
        assert_eq!(report.growth[0].percent_change, Some(100.0));
        assert_eq!(report.decline.len(), 1);
        assert_eq!(report.decline[0].station_key, "raineystcummings");
        assert_eq!(report.decline[0].station_name, "Rainey St @ Cummings");
        assert_eq!(report.decline[0].absolute_change, Some(-7));
    }

    #[test]
    fn test_empty_input_gives_empty_lists() {
        let report = trend_report(&CleanedDataset::default(), &AnalysisConfig::default());
        assert!(report.growth.is_empty());
        assert!(report.decline.is_empty());
    }
}
