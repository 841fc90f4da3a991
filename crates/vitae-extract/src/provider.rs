//! Extraction provider contract.
//!
//! A provider is a pluggable backend with its own cost/latency/quality
//! profile. Providers are probed before the expensive path runs, and
//! every failure is a [`ProviderFailure`] consumed inside the chain —
//! provider errors never escape to the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use vitae_core::defaults::PROBE_TIMEOUT_SECS;

/// Why one provider attempt did not produce an accepted result.
///
/// These drive fallthrough to the next provider and are never surfaced
/// as pipeline errors.
#[derive(Debug, Clone, Error)]
pub enum ProviderFailure {
    /// Health probe failed or timed out — the expensive path was
    /// skipped entirely.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The extraction call exceeded its execution deadline.
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),

    /// The response could not be coerced into anything usable.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The provider answered but produced nothing of substance.
    #[error("empty result")]
    Empty,

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(String),
}

/// Input to one extraction attempt.
///
/// The Upload Gateway owns the raw file; the pipeline hands providers a
/// stable file reference, the bytes when they were locally readable,
/// and any pre-extracted text.
#[derive(Debug, Clone, Default)]
pub struct ExtractionInput {
    /// Resume title, used for placeholder naming when extraction fails.
    pub title: String,
    /// Stable reference into the Upload Gateway's file store.
    pub file_ref: String,
    /// File bytes, when the reference was readable within its deadline.
    pub file_bytes: Option<Vec<u8>>,
    /// Best-effort pre-extracted document text.
    pub raw_text: Option<String>,
}

impl ExtractionInput {
    /// The best document text available to text-based providers.
    pub fn text(&self) -> Option<&str> {
        self.raw_text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Raw output of one provider call, before normalization.
///
/// Providers answer in heterogeneous shapes — well-formed JSON, a
/// free-text answer, or JSON buried in a fenced block. The chain
/// normalizes every shape into the canonical schema immediately after
/// the call.
#[derive(Debug, Clone)]
pub struct RawExtraction {
    /// Structured payload, when the provider already returned one.
    pub structured: Option<JsonValue>,
    /// Free-text answer body (may contain an embedded JSON block).
    pub body: Option<String>,
    /// Original document text, when the provider returned it.
    pub source_text: Option<String>,
    /// Provider identifier for attribution.
    pub provider: String,
    /// Confidence when the payload resolves to structured data.
    pub confidence_structured: f32,
    /// Confidence when only free text could be recovered.
    pub confidence_text: f32,
}

/// A pluggable extraction backend.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    /// Stable provider identifier (e.g. "local-model").
    fn id(&self) -> &str;

    /// Whether this provider is health-probed before extraction.
    /// Deterministic local providers skip the probe.
    fn requires_probe(&self) -> bool {
        true
    }

    /// Deadline for the health probe.
    fn probe_timeout(&self) -> Duration {
        Duration::from_secs(PROBE_TIMEOUT_SECS)
    }

    /// Deadline for the extraction call.
    fn extract_timeout(&self) -> Duration;

    /// Short availability check. Must be cheap; the chain bounds it
    /// with [`probe_timeout`](Self::probe_timeout).
    async fn probe(&self) -> bool;

    /// Attempt extraction. Bounded by
    /// [`extract_timeout`](Self::extract_timeout) in the chain.
    async fn extract(&self, input: &ExtractionInput)
        -> std::result::Result<RawExtraction, ProviderFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_text_filters_blank() {
        let mut input = ExtractionInput {
            raw_text: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(input.text().is_none());

        input.raw_text = Some("content".to_string());
        assert_eq!(input.text(), Some("content"));

        input.raw_text = None;
        assert!(input.text().is_none());
    }

    #[test]
    fn failure_display() {
        let f = ProviderFailure::Timeout(Duration::from_secs(90));
        assert!(f.to_string().contains("90"));
        let f = ProviderFailure::Unavailable("probe refused".into());
        assert!(f.to_string().contains("probe refused"));
    }
}
