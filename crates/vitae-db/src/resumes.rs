//! Resume repository: the processing-record state machine.
//!
//! Every multi-field update is one SQL statement, so readers never
//! observe a resume with `processing_status = completed` but missing
//! extraction fields. There is no in-process locking; concurrent
//! duplicate runs settle by last writer wins.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use vitae_core::{
    new_v7, CanonicalResume, CreateResumeRequest, Error, ProcessingStatus, Result, Resume,
    ResumeStatus, ResumeStatusView, TenantContext,
};

/// PostgreSQL resume repository. All operations are scoped by an
/// explicit [`TenantContext`].
pub struct PgResumeRepository {
    pool: Pool<Postgres>,
}

impl PgResumeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, ctx: &TenantContext, req: CreateResumeRequest) -> Result<Uuid> {
        let id = new_v7();
        let now = Utc::now();

        sqlx::query(&format!(
            "INSERT INTO {} (id, user_id, title, file_ref, status, processing_status, raw_text, created_at, updated_at)
             VALUES ($1, $2, $3, $4, 'uploaded', 'pending', $5, $6, $6)",
            ctx.table("resumes")
        ))
        .bind(id)
        .bind(req.user_id)
        .bind(&req.title)
        .bind(&req.file_ref)
        .bind(&req.raw_text)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Resume>> {
        let row = sqlx::query(&format!(
            "SELECT id, user_id, title, file_ref, status, processing_status,
                    processing_started_at, processing_completed_at, processing_error,
                    provider_used, extraction_confidence, extracted_name, extracted_email,
                    extracted_phone, extracted_location, extracted_summary, extracted_skills,
                    extracted_experience, extracted_education, raw_text, created_at, updated_at
             FROM {} WHERE id = $1",
            ctx.table("resumes")
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    /// Mark a resume as queued for processing.
    pub async fn mark_queued(&self, ctx: &TenantContext, id: Uuid) -> Result<()> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET processing_status = 'queued', updated_at = $1 WHERE id = $2",
            ctx.table("resumes")
        ))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::require_row(result.rows_affected(), id)
    }

    /// Transition to `processing`, recording when work started.
    pub async fn mark_processing(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET status = 'processing', processing_status = 'processing',
                    processing_started_at = $1, processing_error = NULL, updated_at = $2
             WHERE id = $3",
            ctx.table("resumes")
        ))
        .bind(started_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::require_row(result.rows_affected(), id)
    }

    /// Persist an accepted canonical result and transition to
    /// `completed` in one atomic write.
    ///
    /// On success `provider_used` and `extraction_confidence` are
    /// always non-null, even at minimal-tier values.
    pub async fn mark_completed(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        canonical: &CanonicalResume,
    ) -> Result<()> {
        let now = Utc::now();
        let confidence = canonical.confidence.clamp(0.0, 1.0);

        let result = sqlx::query(&format!(
            "UPDATE {} SET
                status = 'processed',
                processing_status = 'completed',
                processing_completed_at = $1,
                processing_error = NULL,
                provider_used = $2,
                extraction_confidence = $3,
                extracted_name = COALESCE($4, title),
                extracted_email = $5,
                extracted_phone = $6,
                extracted_location = $7,
                extracted_summary = $8,
                extracted_skills = $9,
                extracted_experience = $10,
                extracted_education = $11,
                raw_text = $12,
                updated_at = $1
             WHERE id = $13",
            ctx.table("resumes")
        ))
        .bind(now)
        .bind(&canonical.provider_used)
        .bind(confidence)
        .bind(&canonical.contact.name)
        .bind(&canonical.contact.email)
        .bind(&canonical.contact.phone)
        .bind(&canonical.contact.location)
        .bind(&canonical.summary)
        .bind(json!(canonical.skills))
        .bind(json!(canonical.experience))
        .bind(json!(canonical.education))
        .bind(&canonical.raw_text)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "resumes",
            op = "mark_completed",
            resume_id = %id,
            provider = %canonical.provider_used,
            confidence = confidence,
            "Persisted canonical extraction result"
        );

        Self::require_row(result.rows_affected(), id)
    }

    /// Transition to `failed` with a human-readable error.
    pub async fn mark_failed(&self, ctx: &TenantContext, id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();
        let result = sqlx::query(&format!(
            "UPDATE {} SET status = 'failed', processing_status = 'failed',
                    processing_completed_at = $1, processing_error = $2, updated_at = $1
             WHERE id = $3",
            ctx.table("resumes")
        ))
        .bind(now)
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::require_row(result.rows_affected(), id)
    }

    /// Reset a resume for reprocessing: back to `pending` with every
    /// extraction field cleared, as one atomic update.
    pub async fn reset_for_reprocess(&self, ctx: &TenantContext, id: Uuid) -> Result<()> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET
                status = 'uploaded',
                processing_status = 'pending',
                processing_started_at = NULL,
                processing_completed_at = NULL,
                processing_error = NULL,
                provider_used = NULL,
                extraction_confidence = NULL,
                extracted_name = NULL,
                extracted_email = NULL,
                extracted_phone = NULL,
                extracted_location = NULL,
                extracted_summary = NULL,
                extracted_skills = NULL,
                extracted_experience = NULL,
                extracted_education = NULL,
                updated_at = $1
             WHERE id = $2",
            ctx.table("resumes")
        ))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Self::require_row(result.rows_affected(), id)
    }

    /// The read-only status query served to the presentation layer.
    pub async fn status_view(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<Option<ResumeStatusView>> {
        let resume = match self.get(ctx, id).await? {
            Some(r) => r,
            None => return Ok(None),
        };

        let extracted_data = if resume.processing_status == ProcessingStatus::Completed {
            Some(json!({
                "name": resume.extracted_name,
                "email": resume.extracted_email,
                "phone": resume.extracted_phone,
                "location": resume.extracted_location,
                "summary": resume.extracted_summary,
                "skills": resume.extracted_skills.clone().unwrap_or_else(|| json!([])),
                "experience": resume.extracted_experience.clone().unwrap_or_else(|| json!([])),
                "education": resume.extracted_education.clone().unwrap_or_else(|| json!([])),
            }))
        } else {
            None
        };

        Ok(Some(ResumeStatusView {
            processing_status: resume.processing_status,
            processing_started_at: resume.processing_started_at,
            processing_completed_at: resume.processing_completed_at,
            processing_error: resume.processing_error.clone(),
            provider_used: resume.provider_used.clone(),
            extraction_confidence: resume.extraction_confidence,
            processing_time_seconds: resume.processing_time_seconds(),
            extracted_data,
        }))
    }

    /// Reset resumes stuck in `processing` past the SLA back to
    /// `pending`, attaching a diagnostic message. Returns the number of
    /// rows reset.
    pub async fn reset_stuck(
        &self,
        ctx: &TenantContext,
        older_than: DateTime<Utc>,
        diagnostic: &str,
    ) -> Result<i64> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET processing_status = 'pending',
                    processing_started_at = NULL, processing_error = $1, updated_at = $2
             WHERE processing_status = 'processing' AND processing_started_at < $3",
            ctx.table("resumes")
        ))
        .bind(diagnostic)
        .bind(Utc::now())
        .bind(older_than)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let count = result.rows_affected() as i64;
        if count > 0 {
            debug!(
                subsystem = "db",
                component = "resumes",
                op = "reset_stuck",
                partition = ctx.partition(),
                reset_count = count,
                "Reset stuck resumes"
            );
        }
        Ok(count)
    }

    /// Accepted-provider breakdown for completed resumes in this
    /// partition.
    pub async fn provider_breakdown(
        &self,
        ctx: &TenantContext,
    ) -> Result<std::collections::HashMap<String, i64>> {
        let rows = sqlx::query(&format!(
            "SELECT COALESCE(provider_used, 'unknown') AS provider, COUNT(*) AS count
             FROM {} WHERE processing_status = 'completed'
             GROUP BY provider_used",
            ctx.table("resumes")
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut breakdown = std::collections::HashMap::new();
        for row in rows {
            breakdown.insert(row.get::<String, _>("provider"), row.get::<i64, _>("count"));
        }
        Ok(breakdown)
    }

    fn require_row(rows_affected: u64, id: Uuid) -> Result<()> {
        if rows_affected == 0 {
            Err(Error::ResumeNotFound(id))
        } else {
            Ok(())
        }
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> Resume {
        Resume {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
            file_ref: row.get("file_ref"),
            status: ResumeStatus::parse(row.get("status")),
            processing_status: ProcessingStatus::parse(row.get("processing_status")),
            processing_started_at: row.get("processing_started_at"),
            processing_completed_at: row.get("processing_completed_at"),
            processing_error: row.get("processing_error"),
            provider_used: row.get("provider_used"),
            extraction_confidence: row.get("extraction_confidence"),
            extracted_name: row.get("extracted_name"),
            extracted_email: row.get("extracted_email"),
            extracted_phone: row.get("extracted_phone"),
            extracted_location: row.get("extracted_location"),
            extracted_summary: row.get("extracted_summary"),
            extracted_skills: row.get("extracted_skills"),
            extracted_experience: row.get("extracted_experience"),
            extracted_education: row.get("extracted_education"),
            raw_text: row.get("raw_text"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}
