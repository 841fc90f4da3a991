//! Durable processing queue.
//!
//! Queue entries live in the shared partition and carry the tenant
//! partition they execute against, so one worker pool serves every
//! tenant. Claims use `FOR UPDATE SKIP LOCKED` for concurrent workers.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use vitae_core::defaults::QUEUE_MAX_RETRIES;
use vitae_core::{new_v7, Error, QueueEntry, QueueStatus, Result};

/// Enqueue contract consumed from the Upload Gateway or a reprocess
/// action.
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    pub resume_id: Uuid,
    pub job_description_id: Option<Uuid>,
    pub provider_preference: Option<String>,
    pub partition_key: String,
}

/// PostgreSQL processing-queue repository.
pub struct PgQueueRepository {
    pool: Pool<Postgres>,
}

impl PgQueueRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a processing request, deduplicated against a live
    /// (pending or processing) entry for the same resume.
    ///
    /// Returns `None` when an equivalent entry is already live — the
    /// atomic `INSERT ... WHERE NOT EXISTS` closes the race between
    /// concurrent duplicate triggers.
    pub async fn enqueue(&self, req: EnqueueRequest) -> Result<Option<Uuid>> {
        let id = new_v7();
        let now = Utc::now();

        let inserted = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO processing_queue
                (id, resume_id, job_description_id, provider_preference, partition_key,
                 status, retry_count, max_retries, created_at)
             SELECT $1, $2, $3, $4, $5, 'pending', 0, $6, $7
             WHERE NOT EXISTS (
                 SELECT 1 FROM processing_queue
                 WHERE resume_id = $2 AND status IN ('pending', 'processing')
             )
             RETURNING id",
        )
        .bind(id)
        .bind(req.resume_id)
        .bind(req.job_description_id)
        .bind(&req.provider_preference)
        .bind(&req.partition_key)
        .bind(QUEUE_MAX_RETRIES)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        if inserted.is_none() {
            debug!(
                subsystem = "db",
                component = "queue",
                op = "enqueue",
                resume_id = %req.resume_id,
                "Duplicate processing request deduplicated"
            );
        }
        Ok(inserted)
    }

    /// Claim the next pending entry, oldest first. Safe under
    /// concurrent workers via `FOR UPDATE SKIP LOCKED`.
    pub async fn claim_next(&self) -> Result<Option<QueueEntry>> {
        let row = sqlx::query(
            "UPDATE processing_queue
             SET status = 'processing', started_at = $1
             WHERE id = (
                 SELECT id FROM processing_queue
                 WHERE status = 'pending'
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING id, resume_id, job_description_id, provider_preference, partition_key,
                       status, retry_count, max_retries, error_message,
                       created_at, started_at, completed_at",
        )
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    /// Mark a claimed entry as completed.
    pub async fn complete(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE processing_queue SET status = 'completed', completed_at = $1 WHERE id = $2",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Record a failure.
    ///
    /// Transient failures retry: the entry returns to `pending` with an
    /// incremented retry count until `max_retries` is exhausted.
    /// Non-retryable failures (missing resume, unresolvable partition)
    /// go terminal immediately.
    pub async fn fail(&self, id: Uuid, error: &str, retryable: bool) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let (retry_count, max_retries): (i32, i32) =
            sqlx::query_as("SELECT retry_count, max_retries FROM processing_queue WHERE id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;

        if retryable && retry_count < max_retries {
            sqlx::query(
                "UPDATE processing_queue
                 SET status = 'pending', retry_count = $1, error_message = $2, started_at = NULL
                 WHERE id = $3",
            )
            .bind(retry_count + 1)
            .bind(error)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        } else {
            sqlx::query(
                "UPDATE processing_queue
                 SET status = 'failed', completed_at = $1, error_message = $2
                 WHERE id = $3",
            )
            .bind(Utc::now())
            .bind(error)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<QueueEntry>> {
        let row = sqlx::query(
            "SELECT id, resume_id, job_description_id, provider_preference, partition_key,
                    status, retry_count, max_retries, error_message,
                    created_at, started_at, completed_at
             FROM processing_queue WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    pub async fn pending_count(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM processing_queue WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(count)
    }

    /// Reset entries stuck in `processing` past the SLA back to
    /// `pending` without consuming a retry. Returns the reset count.
    pub async fn reset_stale(
        &self,
        older_than: DateTime<Utc>,
        diagnostic: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "UPDATE processing_queue
             SET status = 'pending', started_at = NULL, error_message = $1
             WHERE status = 'processing' AND started_at < $2",
        )
        .bind(diagnostic)
        .bind(older_than)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.rows_affected() as i64)
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> QueueEntry {
        QueueEntry {
            id: row.get("id"),
            resume_id: row.get("resume_id"),
            job_description_id: row.get("job_description_id"),
            provider_preference: row.get("provider_preference"),
            partition_key: row.get("partition_key"),
            status: QueueStatus::parse(row.get("status")),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        }
    }
}
