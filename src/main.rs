//! CLI entry point for the headless traffic dashboard.
//!
//! Provides subcommands for running every polled view until interrupted, and
//! one-shot summary, hourly, and CCTV listings against the detection API.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use traffic_dashboard::{
    config::DashboardConfig,
    dashboard::Dashboard,
    dates::{Clock, SystemClock},
    directory::CctvDirectory,
    fetch::BasicClient,
    infra::detection::DetectionApiClient,
    output::{append_report, log_report, log_series, print_json, print_pretty},
    poller::{View, ViewState},
    query::{DateRange, FilterSelection},
    services::DetectionApi,
    views::{HourlyChartView, TodaySummaryView},
};

#[derive(Parser)]
#[command(name = "traffic_dashboard")]
#[command(about = "Polls the traffic-camera detection API and aggregates counts", long_about = None)]
struct Cli {
    /// Detection API base URL [env: DETECTION_API_URL]
    #[arg(long, global = true)]
    detection_url: Option<String>,

    /// Stream server base URL [env: STREAM_API_URL]
    #[arg(long, global = true)]
    stream_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Dimension filters shared by the data subcommands.
#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Vehicle type (Motor, Mobil, Bus, Truk, Sepeda); empty for all
    #[arg(long, default_value = "")]
    vehicle_type: String,

    /// IN or OUT; anything else for both
    #[arg(long, default_value = "")]
    direction: String,

    /// CCTV name; "All" for every camera
    #[arg(long, default_value = "All")]
    cctv: String,
}

impl FilterArgs {
    fn selection(&self, date_range: DateRange) -> FilterSelection {
        FilterSelection {
            vehicle_type: self.vehicle_type.clone(),
            direction: self.direction.clone(),
            cctv_name: self.cctv.clone(),
            date_range,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run every dashboard view and log results as they refresh
    Watch {
        #[command(flatten)]
        filter: FilterArgs,

        /// Stop after this many fresh results (0 = until Ctrl+C)
        #[arg(short = 'n', long, default_value_t = 0)]
        ticks: usize,

        /// Log the whole dashboard snapshot as JSON on each result
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Totals, IN/OUT split, and emissions for a date range
    Summary {
        #[command(flatten)]
        filter: FilterArgs,

        /// First day, YYYY-MM-DD (default: today)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day, YYYY-MM-DD (default: start)
        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(long, default_value_t = false)]
        json: bool,

        /// CSV file to append summary rows to
        #[arg(long)]
        csv: Option<String>,
    },
    /// Hourly counts of the chart vehicle types for one day
    Hourly {
        #[command(flatten)]
        filter: FilterArgs,

        /// Day, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List configured cameras, dropdown options, and the default stream URL
    Cctv {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/traffic_dashboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("traffic_dashboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

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

    let cli = Cli::parse();

    let mut config = DashboardConfig::from_env();
    if let Some(url) = cli.detection_url {
        config.detection_api_url = url;
    }
    if let Some(url) = cli.stream_url {
        config.stream_api_url = url;
    }

    let http = BasicClient::with_timeouts(config.request_timeout, config.connect_timeout)?;
    let api: Arc<dyn DetectionApi> =
        Arc::new(DetectionApiClient::new(config.detection_api_url.clone(), http));
    let clock = SystemClock;

    match cli.command {
        Commands::Watch {
            filter,
            ticks,
            json,
        } => {
            let initial = filter.selection(DateRange::single(clock.today()));
            watch_dashboard(&config, api, initial, ticks, json).await?;
        }
        Commands::Summary {
            filter,
            start,
            end,
            json,
            csv,
        } => {
            let start = start.unwrap_or_else(|| clock.today());
            let range = DateRange::new(start, end.unwrap_or(start));
            let report = TodaySummaryView::new(api)
                .load(&filter.selection(range))
                .await?;

            if json {
                print_json(&report)?;
            } else {
                log_report("summary", &report);
            }

            if let Some(path) = csv {
                let rows = append_report(&path, &report)?;
                info!(path = %path, rows, "Summary rows appended");
            }
        }
        Commands::Hourly { filter, date, json } => {
            let day = date.unwrap_or_else(|| clock.today());
            let chart = HourlyChartView::new(api)
                .load(&filter.selection(DateRange::single(day)))
                .await?;

            if json {
                print_json(&chart)?;
            } else {
                log_series("hourly_chart", &chart.series);
            }
        }
        Commands::Cctv { json } => {
            let mut directory = CctvDirectory::default();
            directory.apply(api.cctv_list().await?);
            if directory.is_empty() {
                warn!("Detection API returned no cameras");
            }

            if json {
                print_json(&directory)?;
            } else {
                for entry in directory.entries() {
                    info!(
                        id = entry.id,
                        name = %entry.name,
                        location = %entry.location,
                        kind = %entry.kind,
                        "CCTV"
                    );
                }
                for option in directory.filter_options() {
                    info!(label = %option.label, value = %option.value, "Filter option");
                }
                print_pretty(&directory);
            }

            match directory.stream_url(&config.stream_api_url) {
                Some(url) => info!(url = %url, "Default stream"),
                None => warn!("No camera available for streaming"),
            }
        }
    }

    Ok(())
}

/// Runs the dashboard until Ctrl+C, or until `ticks` fresh results arrived
/// when `ticks` is non-zero.
#[tracing::instrument(skip(config, api, initial))]
async fn watch_dashboard(
    config: &DashboardConfig,
    api: Arc<dyn DetectionApi>,
    initial: FilterSelection,
    ticks: usize,
    json: bool,
) -> Result<()> {
    let dashboard = Dashboard::start_with_filter(config, api, Arc::new(SystemClock), initial);

    let mut today = dashboard.today.subscribe();
    let mut yesterday = dashboard.yesterday.subscribe();
    let mut hourly = dashboard.hourly_chart.subscribe();
    let mut trend = dashboard.raw_trend.subscribe();
    let mut cctv = dashboard.cctv.subscribe();
    let mut seen = [0u64; 5];

    if ticks == 0 {
        info!("Watching until Ctrl+C");
    }

    let mut received = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping dashboard");
                break;
            }
            Ok(()) = today.changed() => {
                let Some(report) = fresh(&mut today, &mut seen[0]) else { continue };
                log_report("today_summary", &report);
            }
            Ok(()) = yesterday.changed() => {
                let Some(report) = fresh(&mut yesterday, &mut seen[1]) else { continue };
                log_report("yesterday_summary", &report);
            }
            Ok(()) = hourly.changed() => {
                let Some(chart) = fresh(&mut hourly, &mut seen[2]) else { continue };
                log_series("hourly_chart", &chart.series);
            }
            Ok(()) = trend.changed() => {
                let Some(trend) = fresh(&mut trend, &mut seen[3]) else { continue };
                log_report("raw_trend", &trend.report);
                log_series("raw_trend", &trend.first_day);
            }
            Ok(()) = cctv.changed() => {
                let Some(directory) = fresh(&mut cctv, &mut seen[4]) else { continue };
                info!(cameras = directory.entries().len(), "CCTV directory loaded");
                if let Some(url) = dashboard.stream_url() {
                    info!(url = %url, "Default stream");
                }
            }
            else => break,
        }

        if json {
            print_json(&dashboard.snapshot())?;
        }

        received += 1;
        if ticks > 0 && received >= ticks {
            info!(received, "Tick limit reached");
            break;
        }
    }

    dashboard.shutdown().await;
    Ok(())
}

/// The value published in `rx` if it is newer than the last one seen.
fn fresh<T: Clone>(rx: &mut watch::Receiver<ViewState<T>>, seen: &mut u64) -> Option<T> {
    let state = rx.borrow_and_update();
    if state.generation == *seen {
        return None;
    }
    *seen = state.generation;
    state.value.clone()
}
