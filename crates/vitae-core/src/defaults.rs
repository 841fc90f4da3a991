//! Centralized default constants for the vitae pipeline.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates and binaries reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// TENANCY
// =============================================================================

/// Shared/administrative partition holding the tenant and user tables.
pub const SHARED_PARTITION: &str = "public";

/// Reserved subdomain token that resolves to the shared partition.
/// Used only for cross-tenant administrative reads.
pub const ADMIN_SUBDOMAIN: &str = "all";

// =============================================================================
// PROVIDERS
// =============================================================================

/// Default Ollama base URL for the local-model provider.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model for the local-model provider.
pub const LOCAL_GEN_MODEL: &str = "llama3.2:3b";

/// Default base URL for the remote extraction service.
pub const REMOTE_SERVICE_URL: &str = "http://127.0.0.1:8001";

/// Health probe timeout in seconds (all probed providers).
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Extraction call timeout for the local-model provider (seconds).
pub const LOCAL_EXTRACT_TIMEOUT_SECS: u64 = 90;

/// Extraction call timeout for the remote service provider (seconds).
pub const REMOTE_EXTRACT_TIMEOUT_SECS: u64 = 60;

/// Enhancement stage deadline in seconds, decoupled from extraction.
pub const ENHANCE_TIMEOUT_SECS: u64 = 30;

/// Confidence reported by the remote service provider.
pub const REMOTE_CONFIDENCE: f32 = 0.9;

/// Confidence reported by the local-model provider when the response
/// parsed as structured JSON.
pub const LOCAL_CONFIDENCE_STRUCTURED: f32 = 0.8;

/// Confidence reported by the local-model provider when only free text
/// came back.
pub const LOCAL_CONFIDENCE_TEXT: f32 = 0.6;

/// Confidence reported by the heuristic parser over usable text.
pub const HEURISTIC_CONFIDENCE: f32 = 0.3;

/// Confidence reported by the minimal stub provider.
pub const STUB_CONFIDENCE: f32 = 0.1;

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default maximum retry count for transient queue failures.
pub const QUEUE_MAX_RETRIES: i32 = 2;

/// Default worker poll interval in milliseconds when the queue is empty.
pub const WORKER_POLL_INTERVAL_MS: u64 = 500;

/// Default maximum concurrent units of work per worker.
pub const WORKER_MAX_CONCURRENT: usize = 4;

/// Hard ceiling for one unit of work in seconds (3 minutes).
pub const JOB_TIMEOUT_SECS: u64 = 180;

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// REAPER
// =============================================================================

/// Interval between stuck-run sweeps in seconds.
pub const REAPER_INTERVAL_SECS: u64 = 120;

/// SLA after which a `processing` run counts as stuck (3 minutes).
pub const STUCK_SLA_SECS: i64 = 180;

/// Diagnostic message attached to runs the reaper resets.
pub const STUCK_RESET_MESSAGE: &str = "Processing timeout - reset for retry";

// =============================================================================
// ENHANCEMENT
// =============================================================================

/// Maximum number of recommendations kept per enhancement.
pub const MAX_RECOMMENDATIONS: usize = 5;

/// Minimum length for a recommendation line to count as actionable.
pub const MIN_RECOMMENDATION_LEN: usize = 15;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_shorter_than_extraction() {
        assert!(PROBE_TIMEOUT_SECS < REMOTE_EXTRACT_TIMEOUT_SECS);
        assert!(PROBE_TIMEOUT_SECS < LOCAL_EXTRACT_TIMEOUT_SECS);
    }

    #[test]
    fn test_stage_budgets_fit_job_ceiling() {
        // One probe + one extraction + the enhancement stage must fit
        // under the hard job ceiling.
        assert!(PROBE_TIMEOUT_SECS + LOCAL_EXTRACT_TIMEOUT_SECS + ENHANCE_TIMEOUT_SECS
            <= JOB_TIMEOUT_SECS);
    }

    #[test]
    fn test_confidence_tiers_ordered() {
        assert!(STUB_CONFIDENCE < HEURISTIC_CONFIDENCE);
        assert!(HEURISTIC_CONFIDENCE < LOCAL_CONFIDENCE_TEXT);
        assert!(LOCAL_CONFIDENCE_TEXT < LOCAL_CONFIDENCE_STRUCTURED);
        assert!(LOCAL_CONFIDENCE_STRUCTURED < REMOTE_CONFIDENCE);
    }

    #[test]
    fn test_sla_matches_job_ceiling() {
        assert_eq!(STUCK_SLA_SECS as u64, JOB_TIMEOUT_SECS);
    }
}
