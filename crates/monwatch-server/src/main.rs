use anyhow::{Context, Result};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use monwatch_server::config::ServerConfig;
use monwatch_server::logging;
use monwatch_server::replay;
use monwatch_server::scheduler::EvaluationScheduler;
use monwatch_server::state::Monitor;
use monwatch_server::watch_loader;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  monwatch-server [config.toml]                      Evaluate watches over samples read from stdin");
    eprintln!("  monwatch-server replay <config.toml> <feed.csv>    Replay a recorded feed and print the alerts it raises");
    eprintln!();
    eprintln!("Samples are lines of `series,instance,timestamp_millis,value`.");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("replay") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("replay requires <config.toml> and <feed.csv> arguments")
            })?;
            let feed_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("replay requires <feed.csv> argument")
            })?;
            run_replay(config_path, feed_path)
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

fn load_watches(config: &ServerConfig, monitor: &Monitor) -> Result<usize> {
    let Some(path) = &config.watches_file else {
        tracing::warn!("No watches_file configured, nothing will be evaluated");
        return Ok(0);
    };
    watch_loader::reload_alert_engine(path, &monitor.alert_engine, Utc::now().timestamp_millis())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    logging::init(config.log_filter.as_deref())?;

    tracing::info!(
        tick_interval_secs = config.tick_interval_secs,
        raw_capacity = config.retention.raw_capacity,
        max_closed_alerts = config.max_closed_alerts,
        "monwatch-server starting"
    );

    let monitor = Monitor::new(&config)?;
    if let Err(e) = load_watches(&config, &monitor) {
        tracing::error!(error = %e, "Failed to load watches");
    }

    let scheduler = EvaluationScheduler::new(monitor.clone(), config.tick_interval_secs);
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run().await;
    });

    let feed_monitor = monitor.clone();
    let feed_handle = tokio::spawn(async move {
        ingest_stdin(feed_monitor).await;
    });

    tracing::info!("Server started");
    signal::ctrl_c().await?;
    tracing::info!("Shutting down gracefully");

    feed_handle.abort();
    scheduler_handle.abort();

    let stats = monitor.statistics();
    tracing::info!(
        watches = stats.watch_count,
        changes = stats.change_count,
        red = stats.red_alerts(),
        amber = stats.amber_alerts(),
        "Server stopped"
    );
    Ok(())
}

async fn ingest_stdin(monitor: Monitor) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_number = 0usize;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Reading samples from stdin failed");
                break;
            }
        };
        line_number += 1;
        replay::ingest_line(&monitor, line_number, &line);
    }
    tracing::info!(lines = line_number, "Sample feed closed");
}

#[allow(clippy::print_stdout)]
fn run_replay(config_path: &str, feed_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    logging::init(config.log_filter.as_deref())?;

    let monitor = Monitor::new(&config)?;
    let loaded = load_watches(&config, &monitor)?;
    if loaded == 0 {
        anyhow::bail!("No valid watches to replay against");
    }

    let content = std::fs::read_to_string(feed_path)
        .with_context(|| format!("Failed to read feed file '{feed_path}'"))?;
    let samples = replay::parse_feed(&content)
        .with_context(|| format!("Failed to parse feed file '{feed_path}'"))?;

    let summary = replay::replay(&monitor, &samples);
    for alert in &summary.alerts {
        println!("{}", replay::describe(alert));
    }
    println!(
        "{} samples ({} rejected), {} ticks, {} faults, {} alerts",
        summary.samples,
        summary.rejected,
        summary.ticks,
        summary.faults,
        summary.alerts.len()
    );
    println!("{}", serde_json::to_string_pretty(&summary.statistics)?);
    Ok(())
}
