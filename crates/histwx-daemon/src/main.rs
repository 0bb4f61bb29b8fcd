//! Historic weather daemon - poll loop and sink writer
//!
//! This binary coordinates:
//! - One resolver per configured sensor group
//! - Periodic sample resolution with change detection
//! - Changed-sample emission to the configured sinks

mod scheduler;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use histwx_archive::{HistoricResolver, HistoricSeries};
use histwx_config::AppConfig;
use histwx_core::{Observer, SampleSink};
use histwx_sinks::FsSink;

use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting historic weather daemon");

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    if config.sensors.is_empty() {
        anyhow::bail!("No [[sensor]] groups configured");
    }

    let timezone = config.timezone().context("Invalid station timezone")?;
    let observer = Observer {
        latitude: config.latitude(),
        longitude: config.longitude(),
        elevation: config.elevation(),
    };

    // Build one resolver per sensor group; any load failure is fatal
    let mut resolvers = Vec::with_capacity(config.sensors.len());
    for sensor in &config.sensors {
        let series = HistoricSeries::load(&sensor.filename, timezone, sensor.offset_days)
            .with_context(|| format!("Failed to load history file {}", sensor.filename))?;
        info!(
            "Loaded {} records for {} ({} days back)",
            series.len(),
            sensor.location,
            sensor.offset_days
        );
        resolvers.push(HistoricResolver::new(
            series,
            timezone,
            observer,
            sensor.location.clone(),
            sensor.offset_days,
            sensor.offset_hours,
        ));
    }

    let mut sinks: Vec<Box<dyn SampleSink>> = Vec::new();
    if let Some(dir) = config.data_dir() {
        sinks.push(Box::new(FsSink::new(dir).context("Failed to create fs sink")?));
    }

    // Create and run scheduler
    let mut scheduler = Scheduler::new(
        resolvers,
        sinks,
        std::time::Duration::from_secs(config.scan_interval_secs()),
    );

    // Setup signal handler for graceful shutdown
    let shutdown = setup_shutdown_handler();

    info!("Daemon running - press Ctrl+C to stop");

    // Run until shutdown signal
    tokio::select! {
        result = scheduler.run() => {
            if let Err(e) = result {
                error!("Scheduler error: {}", e);
                return Err(e);
            }
        }
        _ = shutdown => {
            info!("Shutdown signal received");
            scheduler.stop();
        }
    }

    info!("Historic weather daemon stopped");
    Ok(())
}

/// Setup graceful shutdown handler
async fn setup_shutdown_handler() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to setup signal handler");
}
