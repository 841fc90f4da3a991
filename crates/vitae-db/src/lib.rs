//! # vitae-db
//!
//! PostgreSQL persistence layer for the vitae pipeline.
//!
//! This crate provides:
//! - Connection pool management
//! - The shared-partition tenant repository and partition resolution
//! - Per-partition repositories for resumes, job descriptions,
//!   processing runs, and enhancements
//! - The durable processing queue claimed by worker pools
//!
//! All partition-scoped repositories take an explicit
//! [`vitae_core::TenantContext`]; there is no ambient tenant state.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vitae_db::{Database, EnqueueRequest};
//! use vitae_core::TenantContext;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/vitae").await?;
//!
//!     let ctx = TenantContext::new("acme_corp")?;
//!     let resume = db.resumes.get(&ctx, resume_id).await?;
//!     Ok(())
//! }
//! ```

pub mod enhancements;
pub mod job_descriptions;
pub mod pool;
pub mod queue;
pub mod resumes;
pub mod runs;
pub mod tenants;

// Test fixtures for integration tests.
// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL.
pub mod test_fixtures;

// Re-export core types
pub use vitae_core::*;

// Re-export repository implementations
pub use enhancements::PgEnhancementRepository;
pub use job_descriptions::PgJobDescriptionRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use queue::{EnqueueRequest, PgQueueRepository};
pub use resumes::PgResumeRepository;
pub use runs::PgRunRepository;
pub use tenants::{CreateTenantRequest, PgTenantRepository};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self { pool }
    }

    /// Connect with default pool configuration and run migrations for
    /// the shared partition.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Internal(format!("Migration failed: {}", e)))?;
        Ok(Self::new(pool))
    }

    /// Tenant repository (shared partition).
    pub fn tenants(&self) -> PgTenantRepository {
        PgTenantRepository::new(self.pool.clone())
    }

    /// Resume repository (partition-scoped).
    pub fn resumes(&self) -> PgResumeRepository {
        PgResumeRepository::new(self.pool.clone())
    }

    /// Job-description repository (partition-scoped).
    pub fn job_descriptions(&self) -> PgJobDescriptionRepository {
        PgJobDescriptionRepository::new(self.pool.clone())
    }

    /// Processing-run repository (partition-scoped).
    pub fn runs(&self) -> PgRunRepository {
        PgRunRepository::new(self.pool.clone())
    }

    /// Enhancement repository (partition-scoped).
    pub fn enhancements(&self) -> PgEnhancementRepository {
        PgEnhancementRepository::new(self.pool.clone())
    }

    /// Processing queue repository (shared partition).
    pub fn queue(&self) -> PgQueueRepository {
        PgQueueRepository::new(self.pool.clone())
    }

    /// The enqueue entry point consumed from the Upload Gateway: insert
    /// a deduplicated queue entry and mark the resume queued.
    ///
    /// Returns `None` when an equivalent request is already live.
    pub async fn enqueue_processing(
        &self,
        ctx: &TenantContext,
        resume_id: uuid::Uuid,
        job_description_id: Option<uuid::Uuid>,
        provider_preference: Option<String>,
    ) -> Result<Option<uuid::Uuid>> {
        let queued = self
            .queue()
            .enqueue(EnqueueRequest {
                resume_id,
                job_description_id,
                provider_preference,
                partition_key: ctx.partition().to_string(),
            })
            .await?;
        if queued.is_some() {
            self.resumes().mark_queued(ctx, resume_id).await?;
        }
        Ok(queued)
    }

    /// The reprocess action: atomically reset the resume to `pending`
    /// with cleared extraction fields, then queue another pass.
    pub async fn reprocess(
        &self,
        ctx: &TenantContext,
        resume_id: uuid::Uuid,
        job_description_id: Option<uuid::Uuid>,
        provider_preference: Option<String>,
    ) -> Result<Option<uuid::Uuid>> {
        self.resumes().reset_for_reprocess(ctx, resume_id).await?;
        self.enqueue_processing(ctx, resume_id, job_description_id, provider_preference)
            .await
    }

    /// Full extraction statistics for one partition.
    pub async fn extraction_stats(&self, ctx: &TenantContext) -> Result<ExtractionStats> {
        let (total, completed, failed, pending, avg_duration_secs) =
            self.runs().extraction_stats(ctx).await?;
        let provider_breakdown = self.resumes().provider_breakdown(ctx).await?;
        Ok(ExtractionStats {
            total,
            completed,
            failed,
            pending,
            avg_duration_secs,
            provider_breakdown,
        })
    }
}
