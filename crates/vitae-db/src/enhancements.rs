//! Enhancement repository.
//!
//! Unique per (resume, job description): re-running an enhancement with
//! the same job description overwrites rather than duplicates.

use chrono::Utc;
use serde_json::json;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use vitae_core::{new_v7, Enhancement, EnhancementResult, Error, Result, TenantContext};

/// PostgreSQL enhancement repository.
pub struct PgEnhancementRepository {
    pool: Pool<Postgres>,
}

impl PgEnhancementRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Upsert the enhancement for one (resume, job description) pair.
    pub async fn upsert(
        &self,
        ctx: &TenantContext,
        resume_id: Uuid,
        job_description_id: Uuid,
        result: &EnhancementResult,
    ) -> Result<Uuid> {
        let now = Utc::now();

        let id = sqlx::query_scalar::<_, Uuid>(&format!(
            "INSERT INTO {} (id, resume_id, job_description_id, enhanced_summary, enhanced_skills,
                             match_score, recommendations, provider_used, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
             ON CONFLICT (resume_id, job_description_id) DO UPDATE SET
                enhanced_summary = EXCLUDED.enhanced_summary,
                enhanced_skills = EXCLUDED.enhanced_skills,
                match_score = EXCLUDED.match_score,
                recommendations = EXCLUDED.recommendations,
                provider_used = EXCLUDED.provider_used,
                updated_at = EXCLUDED.updated_at
             RETURNING id",
            ctx.table("enhancements")
        ))
        .bind(new_v7())
        .bind(resume_id)
        .bind(job_description_id)
        .bind(&result.enhanced_summary)
        .bind(json!(result.enhanced_skills))
        .bind(result.match_score)
        .bind(json!(result.recommendations))
        .bind(&result.provider_used)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    pub async fn get(
        &self,
        ctx: &TenantContext,
        resume_id: Uuid,
        job_description_id: Uuid,
    ) -> Result<Option<Enhancement>> {
        let row = sqlx::query(&format!(
            "SELECT id, resume_id, job_description_id, enhanced_summary, enhanced_skills,
                    match_score, recommendations, provider_used, created_at, updated_at
             FROM {} WHERE resume_id = $1 AND job_description_id = $2",
            ctx.table("enhancements")
        ))
        .bind(resume_id)
        .bind(job_description_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| Enhancement {
            id: r.get("id"),
            resume_id: r.get("resume_id"),
            job_description_id: r.get("job_description_id"),
            enhanced_summary: r.get("enhanced_summary"),
            enhanced_skills: r.get("enhanced_skills"),
            match_score: r.get("match_score"),
            recommendations: r.get("recommendations"),
            provider_used: r.get("provider_used"),
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }))
    }

    /// All enhancements for a resume, newest first.
    pub async fn list_for_resume(
        &self,
        ctx: &TenantContext,
        resume_id: Uuid,
    ) -> Result<Vec<Enhancement>> {
        let rows = sqlx::query(&format!(
            "SELECT id, resume_id, job_description_id, enhanced_summary, enhanced_skills,
                    match_score, recommendations, provider_used, created_at, updated_at
             FROM {} WHERE resume_id = $1 ORDER BY updated_at DESC",
            ctx.table("enhancements")
        ))
        .bind(resume_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|r| Enhancement {
                id: r.get("id"),
                resume_id: r.get("resume_id"),
                job_description_id: r.get("job_description_id"),
                enhanced_summary: r.get("enhanced_summary"),
                enhanced_skills: r.get("enhanced_skills"),
                match_score: r.get("match_score"),
                recommendations: r.get("recommendations"),
                provider_used: r.get("provider_used"),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            })
            .collect())
    }
}
