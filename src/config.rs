//! Analysis parameters.
//!
//! Every threshold the pipelines use lives in [`AnalysisConfig`]. Values can be
//! read from a JSON file on disk; missing keys fall back to the defaults:
//!
//! ```json
//! {
//!   "target_year": 2019,
//!   "min_duration_minutes": 1.0,
//!   "max_duration_minutes": 180.0,
//!   "weekdays": ["Mon", "Tue", "Wed", "Thu", "Fri"],
//!   "peak_top_n": 5,
//!   "trend_top_n": 5,
//!   "min_total_rides": 10,
//!   "min_baseline_rides": 200
//! }
//! ```

use anyhow::{Context, Result, bail};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::analyzers::types::DayType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Year the peak-usage pipeline is restricted to. `None` picks the latest
    /// year the dataset fully covers.
    pub target_year: Option<i32>,
    pub min_duration_minutes: f64,
    pub max_duration_minutes: f64,
    /// Days of the week classified as [`DayType::Weekday`]; the rest are weekend.
    pub weekdays: Vec<Weekday>,
    pub peak_top_n: usize,
    pub trend_top_n: usize,
    /// Stations with fewer rides than this across all years are dropped entirely.
    pub min_total_rides: u64,
    /// A year-over-year record is kept only if the previous year's total exceeds this.
    pub min_baseline_rides: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_year: None,
            min_duration_minutes: 1.0,
            max_duration_minutes: 180.0,
            weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            peak_top_n: 5,
            trend_top_n: 5,
            min_total_rides: 10,
            min_baseline_rides: 200,
        }
    }
}

impl AnalysisConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{path}'"))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("invalid config file '{path}'"))?;
        Ok(config)
    }

    /// Rejects parameter combinations the pipelines cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.min_duration_minutes.is_finite() || !self.max_duration_minutes.is_finite() {
            bail!("duration bounds must be finite numbers");
        }
        if self.min_duration_minutes > self.max_duration_minutes {
            bail!(
                "min_duration_minutes ({}) is greater than max_duration_minutes ({})",
                self.min_duration_minutes,
                self.max_duration_minutes
            );
        }
        if self.weekdays.is_empty() {
            bail!("at least one day must be classified as a weekday");
        }
        if self.peak_top_n == 0 || self.trend_top_n == 0 {
            bail!("top-N sizes must be at least 1");
        }
        Ok(())
    }

    pub fn day_type(&self, day: Weekday) -> DayType {
        if self.weekdays.contains(&day) {
            DayType::Weekday
        } else {
            DayType::Weekend
        }
    }

    pub fn duration_in_bounds(&self, minutes: f64) -> bool {
        minutes >= self.min_duration_minutes && minutes <= self.max_duration_minutes
    }
}

/// Parses a single day name (`mon`, `Monday`, ...) for CLI arguments.
pub fn parse_weekday(s: &str) -> Result<Weekday, String> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| format!("'{s}' is not a day of the week"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_default_thresholds() {
        let config = AnalysisConfig::default();
        assert_eq!(config.min_duration_minutes, 1.0);
        assert_eq!(config.max_duration_minutes, 180.0);
        assert_eq!(config.peak_top_n, 5);
        assert_eq!(config.trend_top_n, 5);
        assert_eq!(config.min_total_rides, 10);
        assert_eq!(config.min_baseline_rides, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_day_type_default_boundary() {
        let config = AnalysisConfig::default();
        assert_eq!(config.day_type(Weekday::Mon), DayType::Weekday);
        assert_eq!(config.day_type(Weekday::Fri), DayType::Weekday);
        assert_eq!(config.day_type(Weekday::Sat), DayType::Weekend);
        assert_eq!(config.day_type(Weekday::Sun), DayType::Weekend);
    }

    #[test]
    fn test_day_type_custom_boundary() {
        let config = AnalysisConfig {
            weekdays: vec![Weekday::Sun, Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu],
            ..Default::default()
        };
        assert_eq!(config.day_type(Weekday::Sun), DayType::Weekday);
        assert_eq!(config.day_type(Weekday::Fri), DayType::Weekend);
    }

    #[test]
    fn test_duration_bounds_are_inclusive() {
        let config = AnalysisConfig::default();
        assert!(config.duration_in_bounds(1.0));
        assert!(config.duration_in_bounds(180.0));
        assert!(!config.duration_in_bounds(0.99));
        assert!(!config.duration_in_bounds(180.5));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let inverted = AnalysisConfig {
            min_duration_minutes: 10.0,
            max_duration_minutes: 5.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let no_weekdays = AnalysisConfig {
            weekdays: vec![],
            ..Default::default()
        };
        assert!(no_weekdays.validate().is_err());

        let zero_top_n = AnalysisConfig {
            peak_top_n: 0,
            ..Default::default()
        };
        assert!(zero_top_n.validate().is_err());
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let path = format!("{}/bikeshare_trends_test_config.json", env::temp_dir().display());
        fs::write(&path, r#"{ "target_year": 2019, "min_baseline_rides": 50 }"#).unwrap();

        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.target_year, Some(2019));
        assert_eq!(config.min_baseline_rides, 50);
        assert_eq!(config.min_total_rides, 10);
        assert_eq!(config.weekdays.len(), 5);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(AnalysisConfig::load("/nonexistent/bikeshare_trends.json").is_err());
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday("mon"), Ok(Weekday::Mon));
        assert_eq!(parse_weekday("Saturday"), Ok(Weekday::Sat));
        assert!(parse_weekday("funday").is_err());
    }
}
