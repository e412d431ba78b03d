//! CLI entry point for the GTFS-RT vehicle feed ingester.
//!
//! Provides subcommands for decoding a single feed for inspection and for
//! polling a live feed, publishing validated vehicles each cycle.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gtfs_rt_vehicles::{
    config::PipelineConfig,
    fetch::{BasicClient, fetch_with_retry},
    output::{CsvSink, LogSink, VehicleSink, append_record},
    parser::{normalize, parse_feed},
    pipeline::Pipeline,
    validate::{BoundingBox, validate},
};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_vehicles")]
#[command(about = "Decode and validate GTFS-RT vehicle position feeds", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

/// Pipeline settings. Flags override the config file, which overrides the
/// built-in defaults.
#[derive(Args)]
struct Settings {
    /// JSON config file
    #[arg(long, global = true, env = "GTFS_CONFIG")]
    config: Option<String>,

    /// Feed URL
    #[arg(long, global = true, env = "GTFS_FEED_URL")]
    feed_url: Option<String>,

    /// Total fetch attempts per cycle
    #[arg(long, global = true, env = "GTFS_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Base backoff delay between attempts, in milliseconds
    #[arg(long, global = true, env = "GTFS_BASE_DELAY_MS")]
    base_delay_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "GTFS_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Bounding box as MIN_LAT,MAX_LAT,MIN_LON,MAX_LON
    #[arg(
        long,
        global = true,
        env = "GTFS_BBOX",
        value_delimiter = ',',
        num_args = 4,
        allow_hyphen_values = true
    )]
    bbox: Option<Vec<f64>>,

    /// Comma-separated tram route ids
    #[arg(long, global = true, env = "GTFS_TRAM_ROUTES", value_delimiter = ',')]
    tram_routes: Option<Vec<String>>,
}

impl Settings {
    fn resolve(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(url) = self.feed_url {
            config.feed_url = url;
        }
        if let Some(n) = self.max_retries {
            config.max_retries = n;
        }
        if let Some(ms) = self.base_delay_ms {
            config.base_delay_ms = ms;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        if let Some(b) = self.bbox {
            if let [min_lat, max_lat, min_lon, max_lon] = b[..] {
                config.bounding_box = BoundingBox {
                    min_lat,
                    max_lat,
                    min_lon,
                    max_lon,
                };
            } else {
                anyhow::bail!("--bbox takes exactly four values");
            }
        }
        if let Some(routes) = self.tram_routes {
            config.tram_routes = routes;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a GTFS-RT feed from a file or URL and log every vehicle
    Decode {
        /// Path to file or URL to fetch (defaults to the configured feed URL)
        #[arg(value_name = "FILE_OR_URL")]
        source: Option<String>,
    },
    /// Poll the feed and publish validated vehicles each cycle
    Run {
        /// CSV file the current cycle's vehicles are staged in; logs them if omitted
        #[arg(short, long)]
        output: Option<String>,

        /// CSV file to append per-cycle statistics to
        #[arg(long)]
        stats_output: Option<String>,

        /// Seconds between cycles
        #[arg(short = 'r', long, default_value_t = 30)]
        interval: u64,

        /// Number of cycles to run (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 1)]
        samples: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_vehicles.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_vehicles.log"));

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
    let config = cli.settings.resolve()?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, stopping");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Commands::Decode { source } => {
            let source = source.unwrap_or_else(|| config.feed_url.clone());
            decode(&config, &source, &cancel).await?;
        }
        Commands::Run {
            output,
            stats_output,
            interval,
            samples,
        } => {
            run(config, output, stats_output, interval, samples, &cancel).await?;
        }
    }

    Ok(())
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(config, cancel))]
async fn fetcher(
    config: &PipelineConfig,
    source: &str,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    if source.starts_with("http") {
        let client = BasicClient::new(config.timeout(), &config.user_agent)?;
        let outcome = fetch_with_retry(&client, source, &config.retry_policy(), cancel).await;
        if !outcome.is_fetched() {
            anyhow::bail!("no data fetched from {source} after {} attempts", outcome.attempts());
        }
        Ok(outcome.into_bytes().to_vec())
    } else {
        std::fs::read(source).with_context(|| format!("reading feed file '{source}'"))
    }
}

/// Decodes one feed and logs every vehicle in it, valid or not.
async fn decode(config: &PipelineConfig, source: &str, cancel: &CancellationToken) -> Result<()> {
    let bytes = fetcher(config, source, cancel).await?;
    info!(bytes = bytes.len(), "Feed loaded");

    let feed = parse_feed(&bytes);
    info!(
        version = feed.header.gtfs_realtime_version.as_deref().unwrap_or("-"),
        timestamp = feed.header.timestamp,
        entities = feed.entities_seen(),
        "Feed header"
    );
    for fault in &feed.faults {
        warn!(index = fault.index, error = %fault.error, "Entity could not be decoded");
    }
    if let Some(error) = &feed.framing_error {
        warn!(%error, "Feed framing broken, remaining bytes ignored");
    }
    if let Some(error) = &feed.header_error {
        warn!(%error, "Feed header could not be decoded");
    }

    let records = normalize(feed);
    LogSink::new(config.classifier()).publish(&records).await?;

    let total = records.len();
    let (valid, rejections) = validate(records, &config.bounding_box);
    info!(
        vehicles = total,
        valid = valid.len(),
        rejected = rejections.total(),
        "Decode complete"
    );
    Ok(())
}

/// Runs feed cycles at a fixed interval until the sample count is reached or
/// the process is interrupted.
#[tracing::instrument(skip(config, cancel), fields(url = %config.feed_url))]
async fn run(
    config: PipelineConfig,
    output: Option<String>,
    stats_output: Option<String>,
    interval: u64,
    samples: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;

    let mut sink: Box<dyn VehicleSink> = match output {
        Some(path) => {
            info!(path = %path, "Staging vehicles to CSV");
            Box::new(CsvSink::new(path, pipeline.classifier().clone()))
        }
        None => Box::new(LogSink::new(pipeline.classifier().clone())),
    };

    if samples == 0 {
        info!(interval, "Sampling infinitely. Press Ctrl+C to stop.");
    } else {
        info!(samples, interval, "Starting sample collection");
    }

    let mut sample_count = 0;

    loop {
        // Check if we've reached the sample limit (0 = infinite)
        if samples > 0 && sample_count >= samples {
            break;
        }
        if cancel.is_cancelled() {
            break;
        }
        sample_count += 1;

        info!(sample = sample_count, "Starting feed cycle");
        let stats = pipeline.run_cycle(sink.as_mut(), cancel).await;

        if let Some(path) = &stats_output {
            if let Err(e) = append_record(path, &stats) {
                error!(error = %e, "Failed to write cycle stats");
            }
        }

        // If not the last sample, wait before next iteration
        if samples == 0 || sample_count < samples {
            info!(interval, "Waiting before next cycle");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
            }
        }
    }

    info!(cycles = sample_count, "Finished polling");
    Ok(())
}
