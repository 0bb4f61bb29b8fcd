//! Periodic sample resolution scheduler

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use histwx_archive::{HistoricResolver, UpdateOutcome};
use histwx_core::SampleSink;

/// Scheduler drives every configured resolver on a fixed cadence and
/// forwards changed samples to the sinks.
pub struct Scheduler {
    resolvers: Vec<HistoricResolver>,
    sinks: Vec<Box<dyn SampleSink>>,
    scan_interval: Duration,
    running: bool,
}

impl Scheduler {
    pub fn new(
        resolvers: Vec<HistoricResolver>,
        sinks: Vec<Box<dyn SampleSink>>,
        scan_interval: Duration,
    ) -> Self {
        Self {
            resolvers,
            sinks,
            scan_interval,
            running: false,
        }
    }

    /// Run the main polling loop
    pub async fn run(&mut self) -> Result<()> {
        self.running = true;

        info!("Scheduler started");
        info!("Scan interval: {}s", self.scan_interval.as_secs());
        info!("Sensor groups: {}", self.resolvers.len());

        let mut ticker = interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.running {
            ticker.tick().await;
            match self.poll_once().await {
                Ok(()) => {}
                Err(e) => {
                    error!("Error resolving samples: {}", e);
                    // Continue running despite errors
                }
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Update every resolver once and emit the changed samples
    pub async fn poll_once(&mut self) -> Result<()> {
        for resolver in &mut self.resolvers {
            match resolver.update() {
                UpdateOutcome::Changed => {
                    let Some(envelope) = resolver.envelope() else {
                        continue;
                    };
                    info!(
                        location = %envelope.location,
                        offset_days = envelope.offset_days,
                        record = %envelope.record_timestamp,
                        "sample changed"
                    );
                    for sink in &mut self.sinks {
                        sink.emit(&envelope)
                            .await
                            .context("Failed to emit sample to sink")?;
                    }
                }
                UpdateOutcome::Unchanged | UpdateOutcome::Throttled => {}
            }
        }
        Ok(())
    }

    /// Stop the polling loop after the current tick
    pub fn stop(&mut self) {
        info!("Stopping scheduler...");
        self.running = false;
    }

    /// Check if scheduler is running
    #[allow(dead_code)]
    pub fn is_running(&self) -> bool {
        self.running
    }
}
