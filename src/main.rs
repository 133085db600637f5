//! CLI entry point for the bikeshare station trends tool.
//!
//! Loads a trip dataset from a file or URL, cleans it, and runs the
//! peak-usage and year-over-year trend pipelines. Results are written as CSV
//! tables and a JSON report, optionally published to S3.

use anyhow::{Context, Result};
use bikeshare_trends::analyzers::types::AnalysisReport;
use bikeshare_trends::analyzers::writetos3::{report_key, write_json_to_s3};
use bikeshare_trends::analyzers::{run_peak, trend};
use bikeshare_trends::config::{AnalysisConfig, parse_weekday};
use bikeshare_trends::fetch::load_source;
use bikeshare_trends::ingest::{CleanedDataset, clean_trips, read_trips};
use bikeshare_trends::output::{self, REPORT_FILE};
use chrono::Weekday;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bikeshare_trends")]
#[command(about = "Peak-hour and year-over-year ridership analysis for bikeshare stations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the busiest (station, day type) peak hours for one year
    Peak(SourceArgs),
    /// Rank stations by year-over-year ridership growth and decline
    Trend(SourceArgs),
    /// Run both pipelines and write every result set plus a JSON report
    Report {
        #[command(flatten)]
        source: SourceArgs,

        /// Optional: S3 bucket to upload the JSON report to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Optional: key prefix for the uploaded report
        #[arg(long)]
        s3_prefix: Option<String>,

        /// Also log the full report as pretty-printed JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List canonical station keys and the raw names merged into each
    Stations(SourceArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// Path to a CSV file (optionally gzipped) or URL to fetch
    #[arg(value_name = "FILE_OR_URL")]
    source: String,

    /// JSON file with analysis parameters
    #[arg(short, long)]
    config: Option<String>,

    /// Directory to write result files to
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// App token for open-data portal downloads
    #[arg(long)]
    app_token: Option<String>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

/// Command-line overrides applied on top of the config file.
#[derive(Args)]
struct ConfigOverrides {
    /// Year for the peak-usage pipeline (default: latest complete year in the data)
    #[arg(long)]
    year: Option<i32>,

    /// Shortest ride kept, in minutes
    #[arg(long)]
    min_duration: Option<f64>,

    /// Longest ride kept, in minutes
    #[arg(long)]
    max_duration: Option<f64>,

    /// Days counted as weekdays, comma separated (e.g. "mon,tue,wed,thu,fri")
    #[arg(long, value_delimiter = ',', value_parser = parse_weekday)]
    weekdays: Option<Vec<Weekday>>,

    /// Number of peak-hour rows to report
    #[arg(long)]
    peak_top_n: Option<usize>,

    /// Number of growth and of decline rows to report
    #[arg(long)]
    trend_top_n: Option<usize>,

    /// Minimum rides across all years for a station to be analysed
    #[arg(long)]
    min_total_rides: Option<u64>,

    /// Previous-year rides a year-over-year record must exceed
    #[arg(long)]
    min_baseline_rides: Option<u64>,
}

impl ConfigOverrides {
    fn apply(self, mut config: AnalysisConfig) -> AnalysisConfig {
        if let Some(year) = self.year {
            config.target_year = Some(year);
        }
        if let Some(v) = self.min_duration {
            config.min_duration_minutes = v;
        }
        if let Some(v) = self.max_duration {
            config.max_duration_minutes = v;
        }
        if let Some(days) = self.weekdays {
            config.weekdays = days;
        }
        if let Some(n) = self.peak_top_n {
            config.peak_top_n = n;
        }
        if let Some(n) = self.trend_top_n {
            config.trend_top_n = n;
        }
        if let Some(v) = self.min_total_rides {
            config.min_total_rides = v;
        }
        if let Some(v) = self.min_baseline_rides {
            config.min_baseline_rides = v;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _log_guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Peak(args) => {
            let (config, dataset, output_dir) = prepare(args).await?;
            let (target_year, peaks) = run_peak(&dataset, &config);
            if let Some(year) = target_year {
                info!(year, "Peak-usage results");
            }
            output::log_peak_hours(&peaks);
            output::write_peak_hours(&output_dir, &peaks)?;
        }
        Commands::Trend(args) => {
            let (config, dataset, output_dir) = prepare(args).await?;
            let report = trend::trend_report(&dataset, &config);
            output::log_trend(&report);
            output::write_trend(&output_dir, &report)?;
        }
        Commands::Report {
            source,
            s3_bucket,
            s3_prefix,
            json,
        } => {
            let (config, dataset, output_dir) = prepare(source).await?;
            let report = run_report(config, dataset).await?;

            output::log_peak_hours(&report.peak_hours);
            output::log_trend(&report.trend);
            if json {
                output::print_json(&report)?;
            }
            output::write_peak_hours(&output_dir, &report.peak_hours)?;
            output::write_trend(&output_dir, &report.trend)?;
            output::write_report_json(&output_dir, &report)?;

            match s3_bucket {
                Some(bucket) => {
                    let sdk_config = aws_config::load_from_env().await;
                    let s3 = aws_sdk_s3::Client::new(&sdk_config);
                    let key = report_key(s3_prefix.as_deref(), REPORT_FILE);
                    write_json_to_s3(&s3, &bucket, &key, &report).await?;
                }
                None => info!("S3 bucket not specified, skipping upload"),
            }
        }
        Commands::Stations(args) => {
            let (_, dataset, _) = prepare(args).await?;
            list_stations(&dataset);
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/bikeshare_trends.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bikeshare_trends.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}

/// Resolves the config, loads and cleans the dataset, and makes sure the
/// output directory exists.
#[tracing::instrument(skip(args), fields(source = %args.source))]
async fn prepare(args: SourceArgs) -> Result<(AnalysisConfig, CleanedDataset, PathBuf)> {
    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    let config = args.overrides.apply(config);
    config.validate()?;
    output::print_pretty(&config);

    let bytes = load_source(&args.source, args.app_token.as_deref()).await?;
    let records = read_trips(bytes.as_slice())
        .with_context(|| format!("failed to read trips from '{}'", args.source))?;
    let dataset = clean_trips(&records, &config);
    if dataset.trips.is_empty() {
        warn!("No trips survived cleaning; results will be empty");
    }

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;

    Ok((config, dataset, args.output_dir))
}

/// Runs the two pipelines side by side on blocking threads; they only share
/// the read-only cleaned dataset.
async fn run_report(config: AnalysisConfig, dataset: CleanedDataset) -> Result<AnalysisReport> {
    let config = Arc::new(config);
    let dataset = Arc::new(dataset);

    let peak_task = {
        let (config, dataset) = (config.clone(), dataset.clone());
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| run_peak(&dataset, &config)))
    };
    let trend_task = {
        let (config, dataset) = (config.clone(), dataset.clone());
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || span.in_scope(|| trend::trend_report(&dataset, &config)))
    };

    let ((target_year, peak_hours), trend) = tokio::try_join!(peak_task, trend_task)?;
    if let Some(year) = target_year {
        info!(year, peak_rows = peak_hours.len(), "Peak-usage results");
    }

    Ok(AnalysisReport::new(
        &dataset,
        &config,
        target_year,
        peak_hours,
        trend,
    ))
}

fn list_stations(dataset: &CleanedDataset) {
    let collisions = dataset.stations.warn_collisions();

    for key in dataset.stations.keys() {
        let variants = dataset.stations.variants(key);
        let rides: u64 = variants.iter().map(|(_, n)| n).sum();
        let names: Vec<&str> = variants.iter().map(|(n, _)| n.as_str()).collect();
        info!(
            station_key = key,
            display_name = %dataset.stations.display_name(key),
            rides,
            variants = ?names,
            "Station"
        );
    }

    info!(
        stations = dataset.stations.len(),
        collisions = collisions.len(),
        "Station list summary"
    );
}
