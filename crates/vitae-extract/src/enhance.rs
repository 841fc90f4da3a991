//! Enhancement providers: scoring an extracted résumé against a job
//! description.
//!
//! Produces a 0–100 match score from keyword/skill overlap and a short,
//! bounded list of actionable suggestions. The stage degrades silently:
//! provider failures fall through to the deterministic keyword scorer,
//! and the pipeline swallows anything that still fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use vitae_core::defaults::{
    ENHANCE_TIMEOUT_SECS, MAX_RECOMMENDATIONS, MIN_RECOMMENDATION_LEN, REMOTE_SERVICE_URL,
};
use vitae_core::keywords::{derive_keywords, overlap_score};
use vitae_core::{CanonicalResume, EnhancementResult, JobDescription};

use crate::normalize::split_skills;
use crate::provider::ProviderFailure;

/// A pluggable enhancement backend.
#[async_trait]
pub trait EnhancementProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn enhance(
        &self,
        resume: &CanonicalResume,
        job: &JobDescription,
    ) -> std::result::Result<EnhancementResult, ProviderFailure>;
}

/// Baseline suggestions offered when no provider produced anything
/// sharper.
const BASE_SUGGESTIONS: &[&str] = &[
    "Use more action verbs (led, managed, developed, implemented)",
    "Add quantifiable achievements with numbers and percentages",
    "Include relevant keywords from the job description",
    "Strengthen your professional summary with specific accomplishments",
    "Highlight technical skills that match the job requirements",
];

/// The searchable text of a résumé for keyword scoring.
fn searchable_text(resume: &CanonicalResume) -> String {
    let mut text = String::with_capacity(resume.raw_text.len() + 128);
    text.push_str(&resume.raw_text);
    text.push(' ');
    text.push_str(&resume.summary);
    for skill in &resume.skills {
        text.push(' ');
        text.push_str(skill);
    }
    text
}

/// Keep only actionable suggestions, bounded.
fn bound_recommendations(recommendations: Vec<String>) -> Vec<String> {
    recommendations
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| r.len() >= MIN_RECOMMENDATION_LEN)
        .take(MAX_RECOMMENDATIONS)
        .collect()
}

// ============================================================================
// Deterministic keyword scorer
// ============================================================================

/// Deterministic enhancement from keyword/skill overlap. No network,
/// never fails; sits at the end of the stage.
pub struct KeywordOverlapEnhancer;

/// Provider identifier for the keyword scorer.
pub const KEYWORD_OVERLAP_ID: &str = "keyword-overlap";

#[async_trait]
impl EnhancementProvider for KeywordOverlapEnhancer {
    fn id(&self) -> &str {
        KEYWORD_OVERLAP_ID
    }

    async fn enhance(
        &self,
        resume: &CanonicalResume,
        job: &JobDescription,
    ) -> std::result::Result<EnhancementResult, ProviderFailure> {
        let keywords = if job.derived_keywords.is_empty() {
            derive_keywords(&job.content)
        } else {
            job.derived_keywords.clone()
        };

        let resume_text = searchable_text(resume);
        let match_score = overlap_score(&keywords, &resume_text);

        let resume_keywords: std::collections::HashSet<String> =
            derive_keywords(&resume_text).into_iter().collect();
        let missing: Vec<&String> = keywords
            .iter()
            .filter(|k| !resume_keywords.contains(k.as_str()))
            .take(5)
            .collect();

        let mut recommendations: Vec<String> =
            BASE_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
        if !missing.is_empty() {
            recommendations.insert(
                0,
                format!(
                    "Consider including these relevant keywords: {}",
                    missing
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            );
        }

        debug!(
            subsystem = "extract",
            component = "enhance",
            provider = KEYWORD_OVERLAP_ID,
            match_score,
            "Computed keyword overlap score"
        );

        Ok(EnhancementResult {
            match_score,
            recommendations: bound_recommendations(recommendations),
            enhanced_summary: None,
            enhanced_skills: resume.skills.clone(),
            provider_used: KEYWORD_OVERLAP_ID.to_string(),
        })
    }
}

// ============================================================================
// Remote enhancement service
// ============================================================================

/// Provider identifier for the remote enhancer.
pub const REMOTE_ENHANCER_ID: &str = "remote-enhancer";

/// Remote `/enhance` client. Degraded responses (`skipped: true`) are
/// treated as provider failures and fall through.
pub struct RemoteEnhancer {
    client: Client,
    base_url: String,
}

impl RemoteEnhancer {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(ENHANCE_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, base_url }
    }

    pub fn from_env() -> Self {
        let base_url = std::env::var("VITAE_REMOTE_SERVICE_URL")
            .unwrap_or_else(|_| REMOTE_SERVICE_URL.to_string());
        Self::new(base_url)
    }

    fn parse_response(&self, body: &JsonValue) -> Option<EnhancementResult> {
        let payload = body
            .get("enhanced_result")
            .or_else(|| body.get("enhanced_resume"))
            .unwrap_or(body);

        let match_score = payload
            .get("match_score")
            .and_then(JsonValue::as_f64)
            .map(|s| (s as f32).clamp(0.0, 100.0))?;

        let recommendations = payload
            .get("suggestions")
            .or_else(|| payload.get("recommendations"))
            .and_then(JsonValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let enhanced_skills = payload
            .get("enhanced_skills")
            .and_then(JsonValue::as_array)
            .map(|items| split_skills(items))
            .unwrap_or_default();

        Some(EnhancementResult {
            match_score,
            recommendations: bound_recommendations(recommendations),
            enhanced_summary: payload
                .get("enhanced_summary")
                .and_then(JsonValue::as_str)
                .map(String::from),
            enhanced_skills,
            provider_used: body
                .get("provider_used")
                .and_then(JsonValue::as_str)
                .unwrap_or(REMOTE_ENHANCER_ID)
                .to_string(),
        })
    }
}

#[async_trait]
impl EnhancementProvider for RemoteEnhancer {
    fn id(&self) -> &str {
        REMOTE_ENHANCER_ID
    }

    async fn enhance(
        &self,
        resume: &CanonicalResume,
        job: &JobDescription,
    ) -> std::result::Result<EnhancementResult, ProviderFailure> {
        let url = format!("{}/enhance", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "resume_data": {
                    "name": resume.contact.name,
                    "email": resume.contact.email,
                    "summary": resume.summary,
                    "skills": resume.skills,
                    "experience": resume.experience,
                    "education": resume.education,
                    "text": resume.raw_text,
                },
                "job_description": job.content,
                "provider": "auto",
            }))
            .send()
            .await
            .map_err(|e| ProviderFailure::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .json::<JsonValue>()
            .await
            .map_err(|e| ProviderFailure::Malformed(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderFailure::Http(format!("enhance returned {}", status)));
        }

        // Degraded contract: {error, skipped: true}
        if body.get("skipped").and_then(JsonValue::as_bool) == Some(true) {
            let reason = body
                .get("error")
                .and_then(JsonValue::as_str)
                .unwrap_or("enhancement skipped");
            return Err(ProviderFailure::Unavailable(reason.to_string()));
        }

        self.parse_response(&body)
            .ok_or_else(|| ProviderFailure::Malformed("no match_score in response".into()))
    }
}

// ============================================================================
// Stage
// ============================================================================

/// Ordered enhancement cascade. The keyword scorer is registered last
/// so the stage has a deterministic floor.
pub struct EnhancementStage {
    providers: Vec<Arc<dyn EnhancementProvider>>,
}

impl EnhancementStage {
    pub fn new(providers: Vec<Arc<dyn EnhancementProvider>>) -> Self {
        Self { providers }
    }

    /// Remote enhancer first, keyword scorer as the floor.
    pub fn standard(remote: RemoteEnhancer) -> Self {
        Self::new(vec![Arc::new(remote), Arc::new(KeywordOverlapEnhancer)])
    }

    pub fn from_env() -> Self {
        Self::standard(RemoteEnhancer::from_env())
    }

    /// Run the cascade. Returns `None` only if every provider failed —
    /// the caller logs and moves on; enhancement never blocks
    /// completion.
    pub async fn run(
        &self,
        resume: &CanonicalResume,
        job: &JobDescription,
    ) -> Option<EnhancementResult> {
        for provider in &self.providers {
            match provider.enhance(resume, job).await {
                Ok(result) => {
                    info!(
                        subsystem = "extract",
                        component = "enhance",
                        provider = provider.id(),
                        match_score = result.match_score,
                        "Enhancement produced"
                    );
                    return Some(result);
                }
                Err(failure) => {
                    warn!(
                        subsystem = "extract",
                        component = "enhance",
                        provider = provider.id(),
                        error = %failure,
                        "Enhancement provider skipped"
                    );
                }
            }
        }
        None
    }
}
