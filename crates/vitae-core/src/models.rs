//! Core entity types for the vitae pipeline.
//!
//! Entities live in per-tenant Postgres schemas ("partitions") except
//! [`Tenant`], which lives in the shared partition. Status enums carry
//! their database string mapping here so every repository uses one
//! canonical encoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ============================================================================
// Tenant
// ============================================================================

/// Lifecycle status of a tenant. Only `active` tenants are eligible for
/// partition resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Inactive,
    Pending,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            _ => Self::Pending,
        }
    }
}

/// A tenant record in the shared partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub display_name: String,
    /// Leading host label that routes to this tenant. Unique.
    pub subdomain: String,
    /// Postgres schema holding this tenant's data. Unique, validated.
    pub partition_key: String,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Resume
// ============================================================================

/// Coarse document lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
}

impl ResumeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "processed" => Self::Processed,
            "failed" => Self::Failed,
            _ => Self::Uploaded,
        }
    }
}

/// Pipeline status for a resume. Only advances forward:
/// pending/queued → processing → {completed, failed}. Reprocessing
/// resets the record to `pending` in one atomic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => Self::Queued,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// True once the pipeline will not touch this resume again without
    /// an explicit reprocess.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A resume record inside a tenant partition.
///
/// The extracted-* fields are written atomically together with the
/// transition to `completed`; readers never observe a completed resume
/// with missing extraction fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub id: Uuid,
    /// Owning user in the shared partition. Carried without a
    /// referential constraint; cross-partition joins are not
    /// transactionally consistent.
    pub user_id: Option<Uuid>,
    pub title: String,
    /// Stable reference into the Upload Gateway's file store.
    pub file_ref: String,
    pub status: ResumeStatus,
    pub processing_status: ProcessingStatus,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub processing_error: Option<String>,
    pub provider_used: Option<String>,
    pub extraction_confidence: Option<f32>,
    pub extracted_name: Option<String>,
    pub extracted_email: Option<String>,
    pub extracted_phone: Option<String>,
    pub extracted_location: Option<String>,
    pub extracted_summary: Option<String>,
    pub extracted_skills: Option<JsonValue>,
    pub extracted_experience: Option<JsonValue>,
    pub extracted_education: Option<JsonValue>,
    pub raw_text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resume {
    /// Seconds spent processing, when both endpoints are recorded.
    pub fn processing_time_seconds(&self) -> Option<f64> {
        match (self.processing_started_at, self.processing_completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

/// Request payload for creating a resume record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateResumeRequest {
    pub user_id: Option<Uuid>,
    pub title: String,
    pub file_ref: String,
    /// Best-effort text pre-extracted by the Upload Gateway, if any.
    pub raw_text: Option<String>,
}

// ============================================================================
// Job description
// ============================================================================

/// Read-only input to the enhancement stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescription {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub company: Option<String>,
    pub content: String,
    /// Keywords derived from `content` at write time (lowercased,
    /// stop-words removed).
    pub derived_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobDescriptionRequest {
    pub user_id: Option<Uuid>,
    pub title: String,
    pub company: Option<String>,
    pub content: String,
}

// ============================================================================
// Processing runs
// ============================================================================

/// Kind of work one run represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    Extraction,
    Enhancement,
    Matching,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Enhancement => "enhancement",
            Self::Matching => "matching",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "enhancement" => Self::Enhancement,
            "matching" => Self::Matching,
            _ => Self::Extraction,
        }
    }
}

/// Status of one run attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// One attempt to execute extraction or enhancement for a resume.
/// A resume accumulates runs over its lifetime (reprocessing, multiple
/// job-description enhancements).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingRun {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub job_description_id: Option<Uuid>,
    pub run_type: RunType,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub match_score: Option<f32>,
    pub result: Option<JsonValue>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Enhancement
// ============================================================================

/// Persisted enhancement for one (resume, job description) pair.
/// Upsert semantics: re-running with the same job description
/// overwrites rather than duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enhancement {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub job_description_id: Uuid,
    pub enhanced_summary: Option<String>,
    pub enhanced_skills: Option<JsonValue>,
    pub match_score: Option<f32>,
    pub recommendations: Option<JsonValue>,
    pub provider_used: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Output of one enhancement provider call, before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementResult {
    /// 0–100 overlap score against the job description.
    pub match_score: f32,
    /// Actionable suggestions, bounded.
    pub recommendations: Vec<String>,
    pub enhanced_summary: Option<String>,
    pub enhanced_skills: Vec<String>,
    pub provider_used: String,
}

// ============================================================================
// Canonical extraction schema
// ============================================================================

/// Contact information within the canonical schema. Fields that failed
/// validation are absent, never garbage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

/// One employment entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub company: String,
    #[serde(default, alias = "position")]
    pub title: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub description: String,
}

/// One education entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub year: String,
}

/// The single normalized structured record every provider is coerced
/// into. Downstream code never branches on provider-specific shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalResume {
    pub contact: ContactInfo,
    pub summary: String,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub raw_text: String,
    pub provider_used: String,
    pub confidence: f32,
}

impl CanonicalResume {
    /// Minimal placeholder record used when every provider failed.
    /// Always valid: non-null summary, minimal-tier confidence.
    pub fn placeholder(title: &str, provider: &str, confidence: f32) -> Self {
        Self {
            contact: ContactInfo {
                name: Some(title.to_string()),
                ..Default::default()
            },
            summary: "Unable to extract summary - please review manually".to_string(),
            skills: Vec::new(),
            experience: Vec::new(),
            education: Vec::new(),
            raw_text: "Text extraction failed".to_string(),
            provider_used: provider.to_string(),
            confidence,
        }
    }

    /// Minimal validity bar for accepting a provider result: non-empty
    /// raw text, or resolvable contact/skills data.
    pub fn has_substance(&self) -> bool {
        !self.raw_text.trim().is_empty()
            || self.contact.name.is_some()
            || self.contact.email.is_some()
            || !self.skills.is_empty()
    }
}

// ============================================================================
// Status query
// ============================================================================

/// Read-only pipeline state served to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeStatusView {
    pub processing_status: ProcessingStatus,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub processing_error: Option<String>,
    pub provider_used: Option<String>,
    pub extraction_confidence: Option<f32>,
    pub processing_time_seconds: Option<f64>,
    pub extracted_data: Option<JsonValue>,
}

// ============================================================================
// Processing queue
// ============================================================================

/// Status of a durable queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// One durable processing request, claimed by a worker with
/// `FOR UPDATE SKIP LOCKED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub job_description_id: Option<Uuid>,
    /// Preferred starting provider for the extraction chain.
    pub provider_preference: Option<String>,
    /// Tenant partition this request executes against.
    pub partition_key: String,
    pub status: QueueStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregate statistics for extraction work, served to admin tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total: i64,
    pub completed: i64,
    pub failed: i64,
    pub pending: i64,
    pub avg_duration_secs: Option<f64>,
    /// Counts by accepted provider.
    pub provider_breakdown: std::collections::HashMap<String, i64>,
}
