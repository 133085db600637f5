//! Station ridership analysis.
//!
//! Both pipelines read the same [`CleanedDataset`](crate::ingest::CleanedDataset)
//! and share no mutable state: [`peak`] ranks hours within each station and
//! day type for one year, [`trend`] compares yearly totals across all years.

pub mod peak;
pub mod trend;
pub mod types;
pub mod utility;
pub mod writetos3;

use chrono::Utc;
use tracing::warn;

use crate::analyzers::types::{AnalysisReport, PeakHour, TrendReport};
use crate::config::AnalysisConfig;
use crate::ingest::{CleanedDataset, latest_complete_year};

/// The configured analysis year, or the latest year the data fully covers.
pub fn resolve_target_year(dataset: &CleanedDataset, config: &AnalysisConfig) -> Option<i32> {
    config
        .target_year
        .or_else(|| latest_complete_year(&dataset.trips))
}

/// Peak-usage results for the resolved target year. Empty when the dataset
/// has no trips to derive a year from.
pub fn run_peak(dataset: &CleanedDataset, config: &AnalysisConfig) -> (Option<i32>, Vec<PeakHour>) {
    match resolve_target_year(dataset, config) {
        Some(year) => (Some(year), peak::peak_hours(dataset, year, config)),
        None => {
            warn!("No target year configured and no trips to derive one from");
            (None, Vec::new())
        }
    }
}

impl AnalysisReport {
    pub fn new(
        dataset: &CleanedDataset,
        config: &AnalysisConfig,
        target_year: Option<i32>,
        peak_hours: Vec<PeakHour>,
        trend: TrendReport,
    ) -> Self {
        AnalysisReport {
            schema_version: 1,
            generated_at: Utc::now(),
            config: config.clone(),
            target_year,
            cleaning: dataset.summary.clone(),
            peak_hours,
            trend,
            station_collisions: dataset.stations.warn_collisions(),
        }
    }
}

/// Runs both pipelines one after the other and assembles the report.
pub fn analyze(dataset: &CleanedDataset, config: &AnalysisConfig) -> AnalysisReport {
    let (target_year, peak_hours) = run_peak(dataset, config);
    let trend = trend::trend_report(dataset, config);
    AnalysisReport::new(dataset, config, target_year, peak_hours, trend)
}
