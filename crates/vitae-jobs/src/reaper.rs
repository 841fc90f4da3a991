//! Stuck-run reaper.
//!
//! Periodic sweep across all tenant partitions, resetting resumes and
//! queue entries stuck in `processing` past the SLA back to `pending`
//! so they can be retried. A failure in one partition never aborts the
//! sweep of the rest.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use vitae_core::defaults::{
    REAPER_INTERVAL_SECS, SHARED_PARTITION, STUCK_RESET_MESSAGE, STUCK_SLA_SECS,
};
use vitae_core::{Result, TenantContext};
use vitae_db::Database;

/// Configuration for the reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Seconds between sweeps.
    pub interval_secs: u64,
    /// Age in seconds after which a `processing` run counts as stuck.
    pub sla_secs: i64,
    /// Whether the reaper runs at all.
    pub enabled: bool,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval_secs: REAPER_INTERVAL_SECS,
            sla_secs: STUCK_SLA_SECS,
            enabled: true,
        }
    }
}

impl ReaperConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `VITAE_REAPER_ENABLED` | `true` | Enable/disable the sweep |
    /// | `VITAE_REAPER_INTERVAL_SECS` | `120` | Seconds between sweeps |
    /// | `VITAE_STUCK_SLA_SECS` | `180` | Stuck threshold |
    pub fn from_env() -> Self {
        let enabled = std::env::var("VITAE_REAPER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let interval_secs = std::env::var("VITAE_REAPER_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(REAPER_INTERVAL_SECS);

        let sla_secs = std::env::var("VITAE_STUCK_SLA_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(STUCK_SLA_SECS);

        Self {
            interval_secs,
            sla_secs,
            enabled,
        }
    }

    pub fn with_interval(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_sla(mut self, secs: i64) -> Self {
        self.sla_secs = secs;
        self
    }
}

/// Outcome of one sweep.
#[derive(Debug, Default, Clone)]
pub struct SweepReport {
    /// Partitions visited.
    pub partitions_swept: usize,
    /// Partitions that errored (logged, sweep continued).
    pub partition_errors: usize,
    /// Stuck resumes reset across all partitions.
    pub resumes_reset: i64,
    /// Stale queue entries reset in the shared partition.
    pub queue_entries_reset: i64,
}

impl SweepReport {
    /// Total records reclaimed by this sweep.
    pub fn total_reset(&self) -> i64 {
        self.resumes_reset + self.queue_entries_reset
    }
}

/// Handle for stopping a running reaper.
pub struct ReaperHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ReaperHandle {
    /// Signal the reaper to stop after the current sweep.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| vitae_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }
}

/// Periodic stuck-run sweeper.
pub struct Reaper {
    db: Database,
    config: ReaperConfig,
}

impl Reaper {
    pub fn new(db: Database, config: ReaperConfig) -> Self {
        Self { db, config }
    }

    /// Start the interval loop and return a stop handle.
    pub fn start(self) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        ReaperHandle { shutdown_tx }
    }

    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Reaper is disabled, not starting");
            return;
        }

        info!(
            interval_secs = self.config.interval_secs,
            sla_secs = self.config.sla_secs,
            "Reaper started"
        );

        let interval = Duration::from_secs(self.config.interval_secs);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Reaper received shutdown signal");
                    break;
                }
                _ = sleep(interval) => {
                    let report = self.sweep().await;
                    if report.total_reset() > 0 {
                        info!(
                            reset_count = report.total_reset(),
                            partitions = report.partitions_swept,
                            "Reset stuck processing runs"
                        );
                    } else {
                        debug!(partitions = report.partitions_swept, "No stuck runs found");
                    }
                }
            }
        }

        info!("Reaper stopped");
    }

    /// One sweep over every partition. Never fails: per-partition
    /// errors are counted and logged.
    pub async fn sweep(&self) -> SweepReport {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.config.sla_secs);
        let mut report = SweepReport::default();

        // Stale queue entries live in the shared partition.
        match self.db.queue().reset_stale(cutoff, STUCK_RESET_MESSAGE).await {
            Ok(count) => report.queue_entries_reset = count,
            Err(e) => {
                error!(error = %e, "Failed to reset stale queue entries");
                report.partition_errors += 1;
            }
        }

        let mut partitions = match self.db.tenants().list_active_partitions().await {
            Ok(partitions) => partitions,
            Err(e) => {
                error!(error = %e, "Failed to list partitions; sweeping shared partition only");
                report.partition_errors += 1;
                Vec::new()
            }
        };
        // The shared partition can hold development-fallback data.
        if !partitions.iter().any(|p| p == SHARED_PARTITION) {
            partitions.push(SHARED_PARTITION.to_string());
        }

        for partition in partitions {
            report.partitions_swept += 1;
            let ctx = match TenantContext::new(partition.clone()) {
                Ok(ctx) => ctx,
                Err(e) => {
                    warn!(partition = %partition, error = %e, "Skipping invalid partition");
                    report.partition_errors += 1;
                    continue;
                }
            };

            match self
                .db
                .resumes()
                .reset_stuck(&ctx, cutoff, STUCK_RESET_MESSAGE)
                .await
            {
                Ok(count) => {
                    if count > 0 {
                        warn!(
                            partition = %partition,
                            reset_count = count,
                            "Found stuck resumes; reset for retry"
                        );
                    }
                    report.resumes_reset += count;
                }
                Err(e) => {
                    // One bad partition must not abort the rest.
                    error!(
                        partition = %partition,
                        error = %e,
                        "Failed to sweep partition"
                    );
                    report.partition_errors += 1;
                }
            }
        }

        report
    }
}
