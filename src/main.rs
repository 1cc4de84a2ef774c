//! CLI entry point for neostats.
//!
//! `chart` fetches the NEO feed for a date range and prints the per-day chart
//! with its summaries. `analyze` does the same from a saved feed file.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use neostats::analyzers::aggregate::aggregate;
use neostats::analyzers::types::DateRange;
use neostats::config::FeedConfig;
use neostats::output::ConsoleView;
use neostats::parser::parse_feed;
use neostats::store::{FeedStore, FetchState};
use neostats::view_model::{ChartView, ChartViewModel, ChartViewState};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "neostats")]
#[command(about = "Charts near-Earth objects from NASA's NeoWs feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the feed for a date range and print the chart
    Chart {
        /// First day (YYYY-MM-DD), defaults to a week ago
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD), defaults to yesterday
        #[arg(short, long)]
        end: Option<NaiveDate>,

        /// Print the chart state as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Aggregate a saved feed JSON file without network access
    Analyze {
        /// Path to a feed response saved as JSON
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// First day (YYYY-MM-DD), defaults to the earliest date in the file
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// Last day (YYYY-MM-DD), defaults to the latest date in the file
        #[arg(short, long)]
        end: Option<NaiveDate>,

        /// Print the chart state as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/neostats.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("neostats.log"));

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

    match cli.command {
        Commands::Chart { start, end, json } => {
            let today = Local::now().date_naive();
            let range = resolve_range(start, end, DateRange::trailing_week(today))?;
            chart(range, json).await?;
        }
        Commands::Analyze {
            source,
            start,
            end,
            json,
        } => {
            analyze(&source, start, end, json)?;
        }
    }

    Ok(())
}

/// Fills missing bounds from `fallback` and rejects an inverted range.
fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    fallback: DateRange,
) -> Result<DateRange> {
    let range = DateRange::checked(start.unwrap_or(fallback.start), end.unwrap_or(fallback.end))?;
    Ok(range)
}

/// Runs one fetch through the store and view model, printing the result.
#[tracing::instrument(skip(range), fields(start = %range.start, end = %range.end))]
async fn chart(range: DateRange, json: bool) -> Result<()> {
    let config = FeedConfig::from_env()?;
    info!(endpoint = %config.endpoint, "Using feed endpoint");

    let store = Arc::new(FeedStore::from_config(&config));
    let mut view_model = ChartViewModel::new(
        Arc::clone(&store),
        ConsoleView {
            json,
            ..Default::default()
        },
        range,
    );

    if let Some(fetch) = view_model.activate() {
        fetch.await.context("feed fetch task panicked")?;
    }
    view_model.process_pending();
    view_model.deactivate();

    if let FetchState::Failed(err) = store.state() {
        error!(error = %err, "Could not load the feed");
        bail!("feed request failed: {err}");
    }

    info!(rendered = view_model.view().rendered, "Chart complete");
    Ok(())
}

/// Aggregates a saved feed file and prints the chart.
#[tracing::instrument(skip(source), fields(source = %source.display()))]
fn analyze(
    source: &Path,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let bytes =
        std::fs::read(source).with_context(|| format!("failed to read {}", source.display()))?;
    let payload =
        parse_feed(&bytes).with_context(|| format!("failed to decode {}", source.display()))?;

    let fallback = match (payload.date_span(), start, end) {
        (Some((first, last)), _, _) => DateRange::new(first, last),
        (None, Some(s), Some(e)) => DateRange::new(s, e),
        (None, _, _) => bail!(
            "{} has no dated entries; pass --start and --end",
            source.display()
        ),
    };

    let range = resolve_range(start, end, fallback)?;
    info!(
        element_count = payload.element_count,
        days = range.day_span(),
        "Aggregating saved feed"
    );

    let state = ChartViewState::from_stats(range, aggregate(&payload, range));
    ConsoleView {
        json,
        ..Default::default()
    }
    .render(&state);
    Ok(())
}
