//! Worker pool consuming the durable processing queue.
//!
//! Claims up to `max_concurrent` entries at a time and processes them
//! concurrently, each under the hard job ceiling. Only sleeps when the
//! queue is empty (backpressure-aware polling).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use vitae_core::defaults::{
    EVENT_BUS_CAPACITY, JOB_TIMEOUT_SECS, WORKER_MAX_CONCURRENT, WORKER_POLL_INTERVAL_MS,
};
use vitae_core::{QueueEntry, Result};
use vitae_db::Database;

use crate::pipeline::ProcessingPipeline;

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrent units of work.
    pub max_concurrent: usize,
    /// Hard ceiling for one unit of work, in seconds.
    pub job_timeout_secs: u64,
    /// Whether to enable processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: WORKER_POLL_INTERVAL_MS,
            max_concurrent: WORKER_MAX_CONCURRENT,
            job_timeout_secs: JOB_TIMEOUT_SECS,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `VITAE_WORKER_ENABLED` | `true` | Enable/disable processing |
    /// | `VITAE_WORKER_MAX_CONCURRENT` | `4` | Max concurrent units of work |
    /// | `VITAE_WORKER_POLL_INTERVAL_MS` | `500` | Polling interval when queue is empty |
    /// | `VITAE_JOB_TIMEOUT_SECS` | `180` | Hard per-job ceiling |
    pub fn from_env() -> Self {
        let enabled = std::env::var("VITAE_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent = std::env::var("VITAE_WORKER_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(WORKER_MAX_CONCURRENT)
            .max(1);

        let poll_interval_ms = std::env::var("VITAE_WORKER_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(WORKER_POLL_INTERVAL_MS);

        let job_timeout_secs = std::env::var("VITAE_JOB_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(JOB_TIMEOUT_SECS);

        Self {
            poll_interval_ms,
            max_concurrent,
            job_timeout_secs,
            enabled,
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set maximum concurrent units of work.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set the hard per-job ceiling.
    pub fn with_job_timeout(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    /// Enable or disable processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A unit of work was claimed and started.
    JobStarted { entry_id: Uuid, resume_id: Uuid },
    /// A unit of work completed successfully.
    JobCompleted { entry_id: Uuid, resume_id: Uuid },
    /// A unit of work failed.
    JobFailed {
        entry_id: Uuid,
        resume_id: Uuid,
        error: String,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| vitae_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that processes queue entries through the pipeline.
pub struct Worker {
    db: Database,
    pipeline: Arc<ProcessingPipeline>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl Worker {
    pub fn new(db: Database, pipeline: ProcessingPipeline, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            db,
            pipeline: Arc::new(pipeline),
            config,
            event_tx,
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// The pending queue depth.
    pub async fn pending_count(&self) -> Result<i64> {
        self.db.queue().pending_count().await
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let worker = Arc::new(self);
        let worker_clone = worker.clone();

        tokio::spawn(async move {
            worker_clone.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the worker loop with concurrent processing.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent,
            job_timeout_secs = self.config.job_timeout_secs,
            "Worker started"
        );

        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            // Check for shutdown before claiming more work.
            if shutdown_rx.try_recv().is_ok() {
                info!("Worker received shutdown signal");
                break;
            }

            let mut claimed = 0;
            let mut tasks = tokio::task::JoinSet::new();

            for _ in 0..self.config.max_concurrent {
                match self.claim_entry().await {
                    Some(entry) => {
                        claimed += 1;
                        let runner = self.runner();
                        tasks.spawn(async move {
                            runner.execute(entry).await;
                        });
                    }
                    None => break,
                }
            }

            if claimed == 0 {
                // Queue empty — sleep before polling again.
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Worker received shutdown signal");
                        break;
                    }
                    _ = sleep(poll_interval) => {}
                }
            } else {
                while let Some(result) = tasks.join_next().await {
                    if let Err(e) = result {
                        error!(error = ?e, "Worker task panicked");
                    }
                }
                // No sleep — immediately try to claim more work.
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Worker stopped");
    }

    /// Claim the next available queue entry.
    async fn claim_entry(&self) -> Option<QueueEntry> {
        match self.db.queue().claim_next().await {
            Ok(entry) => entry,
            Err(e) => {
                error!(error = ?e, "Failed to claim queue entry");
                None
            }
        }
    }

    fn runner(&self) -> WorkerRunner {
        WorkerRunner {
            db: self.db.clone(),
            pipeline: self.pipeline.clone(),
            event_tx: self.event_tx.clone(),
            job_timeout: Duration::from_secs(self.config.job_timeout_secs),
        }
    }
}

/// Reference bundle for executing one claimed entry in a spawned task.
struct WorkerRunner {
    db: Database,
    pipeline: Arc<ProcessingPipeline>,
    event_tx: broadcast::Sender<WorkerEvent>,
    job_timeout: Duration,
}

impl WorkerRunner {
    async fn execute(self, entry: QueueEntry) {
        let start = Instant::now();
        let entry_id = entry.id;
        let resume_id = entry.resume_id;

        info!(
            subsystem = "jobs",
            component = "worker",
            op = "execute",
            entry_id = %entry_id,
            resume_id = %resume_id,
            partition = %entry.partition_key,
            "Processing queue entry"
        );
        let _ = self.event_tx.send(WorkerEvent::JobStarted {
            entry_id,
            resume_id,
        });

        // The hard ceiling: a unit of work that overruns is failed at
        // the queue and retried; the reaper reclaims its resume record.
        let outcome = match tokio::time::timeout(self.job_timeout, self.pipeline.process(&entry))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    entry_id = %entry_id,
                    resume_id = %resume_id,
                    timeout_secs = self.job_timeout.as_secs(),
                    "Unit of work exceeded the job ceiling"
                );
                Err(vitae_core::Error::Internal(format!(
                    "Job exceeded timeout of {}s",
                    self.job_timeout.as_secs()
                )))
            }
        };

        match outcome {
            Ok(()) => {
                if let Err(e) = self.db.queue().complete(entry_id).await {
                    error!(error = ?e, entry_id = %entry_id, "Failed to mark queue entry completed");
                } else {
                    info!(
                        entry_id = %entry_id,
                        resume_id = %resume_id,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Queue entry completed"
                    );
                    let _ = self.event_tx.send(WorkerEvent::JobCompleted {
                        entry_id,
                        resume_id,
                    });
                }
            }
            Err(e) => {
                let retryable = !e.is_non_retryable();
                let message = e.to_string();
                if let Err(db_err) = self.db.queue().fail(entry_id, &message, retryable).await {
                    error!(error = ?db_err, entry_id = %entry_id, "Failed to mark queue entry failed");
                } else {
                    warn!(
                        entry_id = %entry_id,
                        resume_id = %resume_id,
                        error = %message,
                        retryable,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Queue entry failed"
                    );
                    let _ = self.event_tx.send(WorkerEvent::JobFailed {
                        entry_id,
                        resume_id,
                        error: message,
                    });
                }
            }
        }
    }
}
