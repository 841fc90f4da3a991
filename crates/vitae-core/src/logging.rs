//! Structured logging schema and field name constants for vitae.
//!
//! All crates use these constants for consistent structured logging
//! fields, so log aggregation tools can query by standardized names
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "extract", "jobs", "reaper", "notifier"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "chain", "local_model", "pool", "worker"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "claim_next", "probe", "extract", "sweep"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Resume UUID being operated on.
pub const RESUME_ID: &str = "resume_id";

/// Processing run UUID.
pub const RUN_ID: &str = "run_id";

/// Tenant partition for the active unit of work.
pub const PARTITION: &str = "partition";

/// Extraction/enhancement provider identifier.
pub const PROVIDER: &str = "provider";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of stuck runs reset by one reaper sweep.
pub const RESET_COUNT: &str = "reset_count";

/// Extraction confidence attached to an accepted result.
pub const CONFIDENCE: &str = "confidence";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
