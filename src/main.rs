//! suitecast CLI - replay recorded test runs into a webhook.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use suitecast::config::{self, ReporterConfig};
use suitecast::event::{RunEvent, RunListener};
use suitecast::reporter::WebhookReporter;

#[derive(Parser)]
#[command(name = "suitecast")]
#[command(about = "Webhook summary reporter for test runs", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "suitecast.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded event log through the pipeline
    Replay {
        /// Event log file, one JSON event per line
        events: PathBuf,

        /// Aggregate only, even if an endpoint is configured
        #[arg(long)]
        no_delivery: bool,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Replay {
            events,
            no_delivery,
        } => replay_events(&cli.config, &events, no_delivery).await,
        Commands::Validate => validate_config(&cli.config),
    }
}

async fn replay_events(config_path: &Path, events_path: &Path, no_delivery: bool) -> Result<()> {
    let mut config = load_or_default(config_path)?;
    if no_delivery {
        config.endpoint = None;
    }

    let mut reporter = WebhookReporter::new(config)?;
    if reporter.delivery_enabled() {
        info!("delivering summaries to the configured endpoint");
    } else {
        info!("no endpoint configured, aggregating only");
    }

    let log = std::fs::read_to_string(events_path)
        .with_context(|| format!("Failed to read event log: {}", events_path.display()))?;

    let mut replayed = 0usize;
    for (idx, line) in log.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: RunEvent = serde_json::from_str(line)
            .with_context(|| format!("Malformed event on line {}", idx + 1))?;
        reporter
            .dispatch(&event)
            .with_context(|| format!("Event on line {} violates the suite lifecycle", idx + 1))?;
        replayed += 1;
    }

    // Flush whatever the log produced, whether or not it ended cleanly
    // with a runner-end event.
    reporter.shutdown().await;

    let aggregated: usize = reporter.history().values().map(|group| group.len()).sum();
    println!("Replayed {} events, {} root suites aggregated", replayed, aggregated);
    for (group, records) in reporter.history() {
        println!("  {}: {} suite(s)", group, records.len());
    }

    Ok(())
}

fn validate_config(config_path: &Path) -> Result<()> {
    match config::load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("Settings:");
            match &config.endpoint {
                Some(endpoint) => println!("  Endpoint: {}", endpoint),
                None => println!("  Endpoint: (unset, delivery disabled)"),
            }
            println!("  Drain interval: {}ms", config.interval_ms);
            println!("  Rate limit: {}ms", config.rate_limit_ms);
            println!("  Max attempts: {}", config.max_attempts);
            if !config.payload_options.is_empty() {
                println!("  Payload options: {} entries", config.payload_options.len());
            }

            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_or_default(config_path: &Path) -> Result<ReporterConfig> {
    if config_path.exists() {
        let config = config::load_config(config_path)?;
        info!("Loaded configuration from {}", config_path.display());
        Ok(config)
    } else {
        info!(
            "No config file at {}, using defaults",
            config_path.display()
        );
        Ok(ReporterConfig::default())
    }
}
