//! The processing pipeline: one unit of work per queue entry.
//!
//! Stages run sequentially — resolve tenant context, mark processing,
//! run the extraction chain, persist the canonical result atomically,
//! optionally enhance, notify. Per-stage deadlines cancel only their
//! stage; the worker applies the hard job ceiling on top.
//!
//! Only unrecoverable conditions (missing records, unresolvable
//! partition) fail a unit of work. Chain exhaustion still completes the
//! resume at stub confidence, and enhancement failures degrade
//! silently.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use vitae_core::defaults::ENHANCE_TIMEOUT_SECS;
use vitae_core::{
    Error, JobDescription, QueueEntry, Result, Resume, RunType, TenantContext,
};
use vitae_db::Database;
use vitae_extract::{ChainOutcome, EnhancementStage, ExtractionChain, ExtractionInput};

use crate::notifier::CompletionNotifier;

/// Deadline for reading file bytes from the Upload Gateway's store.
const FILE_READ_TIMEOUT_SECS: u64 = 10;

/// One configured pipeline shared by all worker tasks.
pub struct ProcessingPipeline {
    db: Database,
    chain: Arc<ExtractionChain>,
    enhancement: Arc<EnhancementStage>,
    notifier: CompletionNotifier,
}

impl ProcessingPipeline {
    pub fn new(
        db: Database,
        chain: ExtractionChain,
        enhancement: EnhancementStage,
        notifier: CompletionNotifier,
    ) -> Self {
        Self {
            db,
            chain: Arc::new(chain),
            enhancement: Arc::new(enhancement),
            notifier,
        }
    }

    /// Execute one unit of work.
    ///
    /// The returned error is already reflected in the record store
    /// (resume marked failed, run failed, notification fired); the
    /// caller only decides the queue retry.
    pub async fn process(&self, entry: &QueueEntry) -> Result<()> {
        let started = Utc::now();

        // Scoped tenant acquisition: the context lives exactly as long
        // as this unit of work.
        let ctx = TenantContext::new(entry.partition_key.clone())
            .map_err(|e| Error::PartitionResolution(e.to_string()))?;

        let resume = self
            .db
            .resumes()
            .get(&ctx, entry.resume_id)
            .await?
            .ok_or(Error::ResumeNotFound(entry.resume_id))?;

        let job = match entry.job_description_id {
            Some(id) => Some(
                self.db
                    .job_descriptions()
                    .get(&ctx, id)
                    .await?
                    .ok_or(Error::JobDescriptionNotFound(id))?,
            ),
            None => None,
        };

        info!(
            subsystem = "jobs",
            component = "pipeline",
            op = "start",
            resume_id = %resume.id,
            partition = ctx.partition(),
            with_job_description = job.is_some(),
            "Processing resume"
        );

        self.db
            .resumes()
            .mark_processing(&ctx, resume.id, started)
            .await?;

        // A run against a job description is a matching run; plain
        // extraction otherwise.
        let run_type = if job.is_some() {
            RunType::Matching
        } else {
            RunType::Extraction
        };
        let run = self
            .db
            .runs()
            .create(&ctx, resume.id, entry.job_description_id, run_type)
            .await?;

        match self
            .run_stages(&ctx, &resume, job.as_ref(), entry, run.id)
            .await
        {
            Ok(()) => {
                let secs = elapsed_secs(started);
                info!(
                    subsystem = "jobs",
                    component = "pipeline",
                    op = "complete",
                    resume_id = %resume.id,
                    duration_ms = (secs * 1000.0) as u64,
                    "Resume processed"
                );
                self.notifier.processed(resume.id, resume.user_id, secs);
                Ok(())
            }
            Err(e) => {
                let secs = elapsed_secs(started);
                let message = e.to_string();
                warn!(
                    subsystem = "jobs",
                    component = "pipeline",
                    op = "fail",
                    resume_id = %resume.id,
                    error = %message,
                    "Resume processing failed"
                );
                // Best-effort terminal bookkeeping; the original error
                // is what the caller acts on.
                if let Err(db_err) = self.db.runs().fail(&ctx, run.id, &message).await {
                    warn!(error = %db_err, "Failed to record run failure");
                }
                if let Err(db_err) = self.db.resumes().mark_failed(&ctx, resume.id, &message).await
                {
                    warn!(error = %db_err, "Failed to mark resume failed");
                }
                self.notifier.failed(resume.id, resume.user_id, secs, message);
                Err(e)
            }
        }
    }

    /// Extraction, persistence, and the optional enhancement pass.
    async fn run_stages(
        &self,
        ctx: &TenantContext,
        resume: &Resume,
        job: Option<&JobDescription>,
        entry: &QueueEntry,
        run_id: uuid::Uuid,
    ) -> Result<()> {
        let input = self.build_input(resume).await;

        // The chain never raises; exhausting all providers yields the
        // minimal stub record.
        let ChainOutcome { canonical, attempts } = self
            .chain
            .run(&input, entry.provider_preference.as_deref())
            .await;

        self.db
            .resumes()
            .mark_completed(ctx, resume.id, &canonical)
            .await?;

        let payload = json!({
            "provider_used": canonical.provider_used,
            "confidence": canonical.confidence,
            "skipped_providers": attempts
                .iter()
                .map(|a| json!({"provider": a.provider, "reason": a.failure.to_string()}))
                .collect::<Vec<_>>(),
        });
        self.db
            .runs()
            .complete(ctx, run_id, Some(payload), None)
            .await?;

        if let Some(job) = job {
            self.enhance(ctx, resume, &canonical, job).await;
        }

        Ok(())
    }

    /// The enhancement stage: its own deadline, fully decoupled from
    /// the extraction budget, and never a pipeline failure.
    async fn enhance(
        &self,
        ctx: &TenantContext,
        resume: &Resume,
        canonical: &vitae_core::CanonicalResume,
        job: &JobDescription,
    ) {
        let run = match self
            .db
            .runs()
            .create(ctx, resume.id, Some(job.id), RunType::Enhancement)
            .await
        {
            Ok(run) => run,
            Err(e) => {
                warn!(
                    subsystem = "jobs",
                    component = "pipeline",
                    op = "enhance",
                    resume_id = %resume.id,
                    error = %e,
                    "Could not record enhancement run; skipping enhancement"
                );
                return;
            }
        };

        let deadline = Duration::from_secs(ENHANCE_TIMEOUT_SECS);
        let outcome = timeout(deadline, self.enhancement.run(canonical, job)).await;

        match outcome {
            Ok(Some(result)) => {
                let stored = self
                    .db
                    .enhancements()
                    .upsert(ctx, resume.id, job.id, &result)
                    .await;
                match stored {
                    Ok(_) => {
                        let payload = json!({
                            "match_score": result.match_score,
                            "recommendations": result.recommendations,
                            "provider_used": result.provider_used,
                        });
                        if let Err(e) = self
                            .db
                            .runs()
                            .complete(ctx, run.id, Some(payload), Some(result.match_score))
                            .await
                        {
                            warn!(error = %e, "Failed to complete enhancement run");
                        }
                        info!(
                            subsystem = "jobs",
                            component = "pipeline",
                            op = "enhance",
                            resume_id = %resume.id,
                            match_score = result.match_score,
                            "Enhancement persisted"
                        );
                    }
                    Err(e) => {
                        warn!(
                            subsystem = "jobs",
                            component = "pipeline",
                            op = "enhance",
                            resume_id = %resume.id,
                            error = %e,
                            "Failed to persist enhancement"
                        );
                        let _ = self.db.runs().fail(ctx, run.id, &e.to_string()).await;
                    }
                }
            }
            Ok(None) => {
                warn!(
                    subsystem = "jobs",
                    component = "pipeline",
                    op = "enhance",
                    resume_id = %resume.id,
                    "Every enhancement provider failed; continuing without enhancement"
                );
                let _ = self
                    .db
                    .runs()
                    .fail(ctx, run.id, "all enhancement providers failed")
                    .await;
            }
            Err(_) => {
                warn!(
                    subsystem = "jobs",
                    component = "pipeline",
                    op = "enhance",
                    resume_id = %resume.id,
                    timeout_secs = ENHANCE_TIMEOUT_SECS,
                    "Enhancement timed out; continuing without enhancement"
                );
                let _ = self
                    .db
                    .runs()
                    .fail(ctx, run.id, "enhancement timeout")
                    .await;
            }
        }
    }

    /// Assemble the extraction input: file bytes under a bounded read,
    /// plus any pre-extracted text.
    async fn build_input(&self, resume: &Resume) -> ExtractionInput {
        let file_bytes = match timeout(
            Duration::from_secs(FILE_READ_TIMEOUT_SECS),
            tokio::fs::read(&resume.file_ref),
        )
        .await
        {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(e)) => {
                debug!(
                    subsystem = "jobs",
                    component = "pipeline",
                    op = "read_file",
                    resume_id = %resume.id,
                    error = %e,
                    "File reference not locally readable"
                );
                None
            }
            Err(_) => {
                warn!(
                    subsystem = "jobs",
                    component = "pipeline",
                    op = "read_file",
                    resume_id = %resume.id,
                    "File read exceeded deadline"
                );
                None
            }
        };

        ExtractionInput {
            title: resume.title.clone(),
            file_ref: resume.file_ref.clone(),
            file_bytes,
            raw_text: resume.raw_text.clone(),
        }
    }
}

fn elapsed_secs(started: chrono::DateTime<Utc>) -> f64 {
    ((Utc::now() - started).num_milliseconds() as f64 / 1000.0).max(0.0)
}
