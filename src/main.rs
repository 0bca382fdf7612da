use anyhow::{anyhow, Context, Result};
use cassandra_pulse::{Analyzer, AppConfig};
use clap::Parser;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// Health assessment for a Cassandra cluster monitored by AxonOps.
#[derive(Debug, Parser)]
#[command(name = "cassandra-pulse", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Directory the Markdown and JSON reports are written to
    #[arg(short, long, default_value = "./reports")]
    output_dir: PathBuf,

    /// Hours of history to analyze, overriding analysis.hours
    #[arg(long)]
    hours: Option<u32>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    info!("Starting Cassandra Pulse, config={}", args.config.display());
    let general_start_time = SystemTime::now();

    let mut config = AppConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    if let Some(hours) = args.hours {
        config.analysis.hours = hours;
    }

    let analyzer = Analyzer::builder(config)
        .build()
        .await
        .map_err(|e| anyhow!(e))
        .context("Failed to initialize analyzer")?;

    let mut report = analyzer
        .analyze()
        .await
        .map_err(|e| anyhow!(e))
        .context("Analysis failed")?;

    let write_start = SystemTime::now();
    let files = report
        .write_to(&args.output_dir)
        .with_context(|| format!("Failed to write reports to {}", args.output_dir.display()))?;
    report.timed_phases.duration_collection.push_back((
        "write_reports_dur".to_string(),
        write_start.duration_since(UNIX_EPOCH)?.as_millis(),
        write_start.elapsed()?.as_millis(),
    ));
    report.timed_phases.duration_collection.push_back((
        "total_dur".to_string(),
        general_start_time.duration_since(UNIX_EPOCH)?.as_millis(),
        general_start_time.elapsed()?.as_millis(),
    ));

    println!("{}", report);
    println!("Markdown report: {}", files.markdown.display());
    println!("JSON report:     {}", files.json.display());

    Ok(())
}
