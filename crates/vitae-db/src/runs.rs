//! Processing-run repository.
//!
//! One run is one attempt; a resume accumulates runs over its lifetime
//! (reprocessing, multiple job-description enhancements). The store
//! provides no mutual exclusion — terminal updates are single
//! statements and concurrent duplicates resolve last-writer-wins.

use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use vitae_core::{
    new_v7, Error, ProcessingRun, Result, RunStatus, RunType, TenantContext,
};

/// PostgreSQL processing-run repository.
pub struct PgRunRepository {
    pool: Pool<Postgres>,
}

impl PgRunRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a run in `processing` state with `started_at` stamped.
    pub async fn create(
        &self,
        ctx: &TenantContext,
        resume_id: Uuid,
        job_description_id: Option<Uuid>,
        run_type: RunType,
    ) -> Result<ProcessingRun> {
        let id = new_v7();
        let now = Utc::now();

        sqlx::query(&format!(
            "INSERT INTO {} (id, resume_id, job_description_id, run_type, status, started_at, created_at)
             VALUES ($1, $2, $3, $4, 'processing', $5, $5)",
            ctx.table("processing_runs")
        ))
        .bind(id)
        .bind(resume_id)
        .bind(job_description_id)
        .bind(run_type.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(ProcessingRun {
            id,
            resume_id,
            job_description_id,
            run_type,
            status: RunStatus::Processing,
            started_at: Some(now),
            completed_at: None,
            match_score: None,
            result: None,
            error_message: None,
            created_at: now,
        })
    }

    /// Complete a run with its result payload and optional match score.
    pub async fn complete(
        &self,
        ctx: &TenantContext,
        run_id: Uuid,
        result: Option<JsonValue>,
        match_score: Option<f32>,
    ) -> Result<()> {
        let updated = sqlx::query(&format!(
            "UPDATE {} SET status = 'completed', completed_at = $1, result = $2, match_score = $3
             WHERE id = $4",
            ctx.table("processing_runs")
        ))
        .bind(Utc::now())
        .bind(result)
        .bind(match_score)
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!("processing run {}", run_id)));
        }
        Ok(())
    }

    /// Fail a run with an error message.
    pub async fn fail(&self, ctx: &TenantContext, run_id: Uuid, error: &str) -> Result<()> {
        let updated = sqlx::query(&format!(
            "UPDATE {} SET status = 'failed', completed_at = $1, error_message = $2
             WHERE id = $3",
            ctx.table("processing_runs")
        ))
        .bind(Utc::now())
        .bind(error)
        .bind(run_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!("processing run {}", run_id)));
        }
        Ok(())
    }

    pub async fn get(&self, ctx: &TenantContext, run_id: Uuid) -> Result<Option<ProcessingRun>> {
        let row = sqlx::query(&format!(
            "SELECT id, resume_id, job_description_id, run_type, status, started_at,
                    completed_at, match_score, result, error_message, created_at
             FROM {} WHERE id = $1",
            ctx.table("processing_runs")
        ))
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    /// All runs for a resume, newest first.
    pub async fn list_for_resume(
        &self,
        ctx: &TenantContext,
        resume_id: Uuid,
    ) -> Result<Vec<ProcessingRun>> {
        let rows = sqlx::query(&format!(
            "SELECT id, resume_id, job_description_id, run_type, status, started_at,
                    completed_at, match_score, result, error_message, created_at
             FROM {} WHERE resume_id = $1 ORDER BY created_at DESC",
            ctx.table("processing_runs")
        ))
        .bind(resume_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }

    /// Extraction statistics for this partition: counts by status plus
    /// average completed duration.
    pub async fn extraction_stats(
        &self,
        ctx: &TenantContext,
    ) -> Result<(i64, i64, i64, i64, Option<f64>)> {
        let row = sqlx::query(&format!(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                (AVG(EXTRACT(EPOCH FROM (completed_at - started_at)))
                    FILTER (WHERE status = 'completed'
                            AND started_at IS NOT NULL AND completed_at IS NOT NULL)
                )::double precision AS avg_duration_secs
             FROM {} WHERE run_type = 'extraction'",
            ctx.table("processing_runs")
        ))
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok((
            row.get("total"),
            row.get("completed"),
            row.get("failed"),
            row.get("pending"),
            row.try_get("avg_duration_secs").ok(),
        ))
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> ProcessingRun {
        ProcessingRun {
            id: row.get("id"),
            resume_id: row.get("resume_id"),
            job_description_id: row.get("job_description_id"),
            run_type: RunType::parse(row.get("run_type")),
            status: RunStatus::parse(row.get("status")),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
            match_score: row.get("match_score"),
            result: row.get("result"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
        }
    }
}
