//! Tenant repository and partition resolution.
//!
//! Tenant records live in the shared partition. Resolution maps an
//! inbound host string to a validated [`TenantContext`]; the reserved
//! `all` subdomain maps to the shared partition for cross-tenant
//! administrative reads only.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::{info, warn};
use uuid::Uuid;

use vitae_core::{
    extract_subdomain, is_admin_subdomain, new_v7, validate_partition_key, Error, Result, Tenant,
    TenantContext, TenantFallbackPolicy, TenantStatus,
};

/// Request payload for creating a tenant (administrative action).
#[derive(Debug, Clone)]
pub struct CreateTenantRequest {
    pub display_name: String,
    pub subdomain: String,
    /// Partition key; derived from the subdomain when absent.
    pub partition_key: Option<String>,
    /// Initial status; new tenants default to `pending`.
    pub status: Option<TenantStatus>,
}

/// PostgreSQL tenant repository.
pub struct PgTenantRepository {
    pool: Pool<Postgres>,
}

impl PgTenantRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a tenant record and provision its partition.
    ///
    /// The partition key defaults to the subdomain with dashes folded
    /// to underscores, and is validated before any DDL runs.
    pub async fn create(&self, req: CreateTenantRequest) -> Result<Tenant> {
        let partition_key = match req.partition_key {
            Some(key) => key,
            None => req.subdomain.replace('-', "_"),
        };
        validate_partition_key(&partition_key)?;

        let id = new_v7();
        let now = Utc::now();
        let status = req.status.unwrap_or(TenantStatus::Pending);

        sqlx::query(
            "INSERT INTO tenants (id, display_name, subdomain, partition_key, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(&req.display_name)
        .bind(&req.subdomain)
        .bind(&partition_key)
        .bind(status.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        // Provision the schema up front so activation never races
        // against first use.
        self.create_partition(&partition_key).await?;

        info!(
            subsystem = "db",
            component = "tenants",
            op = "create",
            subdomain = %req.subdomain,
            partition = %partition_key,
            "Created tenant"
        );

        Ok(Tenant {
            id,
            display_name: req.display_name,
            subdomain: req.subdomain,
            partition_key,
            status,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Tenant>> {
        let row = sqlx::query(
            "SELECT id, display_name, subdomain, partition_key, status, created_at, updated_at
             FROM tenants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    /// Look up an `active` tenant by subdomain. Inactive and pending
    /// tenants never resolve.
    pub async fn find_active_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>> {
        let row = sqlx::query(
            "SELECT id, display_name, subdomain, partition_key, status, created_at, updated_at
             FROM tenants WHERE subdomain = $1 AND status = 'active' LIMIT 1",
        )
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    /// All partitions belonging to active tenants, for cross-partition
    /// sweeps.
    pub async fn list_active_partitions(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT partition_key FROM tenants WHERE status = 'active' ORDER BY partition_key",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows)
    }

    /// Update a tenant's lifecycle status.
    pub async fn set_status(&self, id: Uuid, status: TenantStatus) -> Result<()> {
        let result = sqlx::query("UPDATE tenants SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("tenant {}", id)));
        }
        Ok(())
    }

    /// Resolve a request host to the active partition for a unit of
    /// work.
    ///
    /// The reserved admin token resolves to the shared partition; any
    /// other subdomain must match an active tenant. A host without a
    /// subdomain, or one matching no active tenant, follows the
    /// configured fallback policy.
    pub async fn resolve_partition(
        &self,
        host: &str,
        policy: &TenantFallbackPolicy,
    ) -> Result<TenantContext> {
        let subdomain = match extract_subdomain(host) {
            Some(s) => s,
            None => return self.apply_fallback(host, "no subdomain in host", policy),
        };

        if is_admin_subdomain(subdomain) {
            return Ok(TenantContext::shared());
        }

        match self.find_active_by_subdomain(subdomain).await? {
            Some(tenant) => TenantContext::new(tenant.partition_key),
            None => self.apply_fallback(host, "no active tenant for subdomain", policy),
        }
    }

    fn apply_fallback(
        &self,
        host: &str,
        reason: &str,
        policy: &TenantFallbackPolicy,
    ) -> Result<TenantContext> {
        match policy {
            TenantFallbackPolicy::Reject => Err(Error::PartitionResolution(format!(
                "{} ('{}')",
                reason, host
            ))),
            TenantFallbackPolicy::Default(partition) => {
                warn!(
                    subsystem = "db",
                    component = "tenants",
                    op = "resolve",
                    host = %host,
                    partition = %partition,
                    "Partition resolution fell back to configured default"
                );
                TenantContext::new(partition.clone())
            }
        }
    }

    /// Provision the schema and tables for one tenant partition.
    ///
    /// Idempotent: every statement is `IF NOT EXISTS`. The partition
    /// key has already been validated as a safe identifier.
    pub async fn create_partition(&self, partition_key: &str) -> Result<()> {
        validate_partition_key(partition_key)?;

        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", partition_key))
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        for ddl in partition_tables_ddl(partition_key) {
            sqlx::query(&ddl)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
        }

        info!(
            subsystem = "db",
            component = "tenants",
            op = "create_partition",
            partition = %partition_key,
            "Provisioned tenant partition"
        );
        Ok(())
    }

    fn parse_row(row: sqlx::postgres::PgRow) -> Tenant {
        Tenant {
            id: row.get("id"),
            display_name: row.get("display_name"),
            subdomain: row.get("subdomain"),
            partition_key: row.get("partition_key"),
            status: TenantStatus::parse(row.get("status")),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// DDL for the per-tenant tables, qualified with the (validated)
/// partition key.
fn partition_tables_ddl(partition: &str) -> Vec<String> {
    vec![
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{p}".resumes (
                id UUID PRIMARY KEY,
                user_id UUID,
                title TEXT NOT NULL,
                file_ref TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'uploaded'
                    CHECK (status IN ('uploaded', 'processing', 'processed', 'failed')),
                processing_status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (processing_status IN ('pending', 'queued', 'processing', 'completed', 'failed')),
                processing_started_at TIMESTAMPTZ,
                processing_completed_at TIMESTAMPTZ,
                processing_error TEXT,
                provider_used TEXT,
                extraction_confidence REAL
                    CHECK (extraction_confidence IS NULL
                           OR (extraction_confidence >= 0 AND extraction_confidence <= 1)),
                extracted_name TEXT,
                extracted_email TEXT,
                extracted_phone TEXT,
                extracted_location TEXT,
                extracted_summary TEXT,
                extracted_skills JSONB,
                extracted_experience JSONB,
                extracted_education JSONB,
                raw_text TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )"#,
            p = partition
        ),
        format!(
            r#"CREATE INDEX IF NOT EXISTS resumes_processing_status_idx
               ON "{p}".resumes (processing_status, processing_started_at)"#,
            p = partition
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{p}".job_descriptions (
                id UUID PRIMARY KEY,
                user_id UUID,
                title TEXT NOT NULL,
                company TEXT,
                content TEXT NOT NULL,
                derived_keywords JSONB NOT NULL DEFAULT '[]'::jsonb,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )"#,
            p = partition
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{p}".processing_runs (
                id UUID PRIMARY KEY,
                resume_id UUID NOT NULL,
                job_description_id UUID,
                run_type TEXT NOT NULL
                    CHECK (run_type IN ('extraction', 'enhancement', 'matching')),
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
                started_at TIMESTAMPTZ,
                completed_at TIMESTAMPTZ,
                match_score REAL,
                result JSONB,
                error_message TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            p = partition
        ),
        format!(
            r#"CREATE INDEX IF NOT EXISTS processing_runs_resume_idx
               ON "{p}".processing_runs (resume_id, created_at DESC)"#,
            p = partition
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{p}".enhancements (
                id UUID PRIMARY KEY,
                resume_id UUID NOT NULL,
                job_description_id UUID NOT NULL,
                enhanced_summary TEXT,
                enhanced_skills JSONB,
                match_score REAL,
                recommendations JSONB,
                provider_used TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                UNIQUE (resume_id, job_description_id)
            )"#,
            p = partition
        ),
    ]
}
