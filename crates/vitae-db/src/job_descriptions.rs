//! Job-description repository.
//!
//! Keywords are derived once at write time so enhancement runs never
//! re-tokenize the posting.

use chrono::Utc;
use serde_json::json;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use vitae_core::keywords::derive_keywords;
use vitae_core::{
    new_v7, CreateJobDescriptionRequest, Error, JobDescription, Result, TenantContext,
};

/// PostgreSQL job-description repository.
pub struct PgJobDescriptionRepository {
    pool: Pool<Postgres>,
}

impl PgJobDescriptionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        ctx: &TenantContext,
        req: CreateJobDescriptionRequest,
    ) -> Result<Uuid> {
        let id = new_v7();
        let now = Utc::now();
        let keywords = derive_keywords(&req.content);

        sqlx::query(&format!(
            "INSERT INTO {} (id, user_id, title, company, content, derived_keywords, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)",
            ctx.table("job_descriptions")
        ))
        .bind(id)
        .bind(req.user_id)
        .bind(&req.title)
        .bind(&req.company)
        .bind(&req.content)
        .bind(json!(keywords))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<JobDescription>> {
        let row = sqlx::query(&format!(
            "SELECT id, user_id, title, company, content, derived_keywords, created_at, updated_at
             FROM {} WHERE id = $1",
            ctx.table("job_descriptions")
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| {
            let keywords: serde_json::Value = r.get("derived_keywords");
            JobDescription {
                id: r.get("id"),
                user_id: r.get("user_id"),
                title: r.get("title"),
                company: r.get("company"),
                content: r.get("content"),
                derived_keywords: serde_json::from_value(keywords).unwrap_or_default(),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            }
        }))
    }
}
