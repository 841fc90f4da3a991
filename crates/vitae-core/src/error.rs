//! Error types for the vitae pipeline.

use thiserror::Error;

/// Result type alias using vitae's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vitae operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resume not found — fatal for a unit of work, never retried
    #[error("Resume not found: {0}")]
    ResumeNotFound(uuid::Uuid),

    /// Job description not found
    #[error("Job description not found: {0}")]
    JobDescriptionNotFound(uuid::Uuid),

    /// No active tenant matched the given subdomain
    #[error("Tenant not found for subdomain: {0}")]
    TenantNotFound(String),

    /// Tenant partition could not be resolved — fatal for the request
    #[error("Partition resolution failed: {0}")]
    PartitionResolution(String),

    /// Extraction pipeline error
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Enhancement stage error (non-fatal, swallowed at the stage boundary)
    #[error("Enhancement error: {0}")]
    Enhancement(String),

    /// Processing queue error
    #[error("Queue error: {0}")]
    Queue(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors that must not be retried by the queue
    /// (the referenced record is gone or the partition is unreachable).
    pub fn is_non_retryable(&self) -> bool {
        matches!(
            self,
            Error::ResumeNotFound(_)
                | Error::JobDescriptionNotFound(_)
                | Error::TenantNotFound(_)
                | Error::PartitionResolution(_)
                | Error::InvalidInput(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_resume_not_found() {
        let id = Uuid::nil();
        let err = Error::ResumeNotFound(id);
        assert_eq!(err.to_string(), format!("Resume not found: {}", id));
    }

    #[test]
    fn test_error_display_tenant_not_found() {
        let err = Error::TenantNotFound("acme".to_string());
        assert_eq!(err.to_string(), "Tenant not found for subdomain: acme");
    }

    #[test]
    fn test_error_display_partition_resolution() {
        let err = Error::PartitionResolution("no active tenant".to_string());
        assert_eq!(
            err.to_string(),
            "Partition resolution failed: no active tenant"
        );
    }

    #[test]
    fn test_error_display_extraction() {
        let err = Error::Extraction("all providers exhausted".to_string());
        assert_eq!(err.to_string(), "Extraction error: all providers exhausted");
    }

    #[test]
    fn test_error_display_queue() {
        let err = Error::Queue("claim failed".to_string());
        assert_eq!(err.to_string(), "Queue error: claim failed");
    }

    #[test]
    fn test_non_retryable_classification() {
        assert!(Error::ResumeNotFound(Uuid::nil()).is_non_retryable());
        assert!(Error::TenantNotFound("x".into()).is_non_retryable());
        assert!(Error::PartitionResolution("x".into()).is_non_retryable());
        assert!(!Error::Request("connection reset".into()).is_non_retryable());
        assert!(!Error::Extraction("timeout".into()).is_non_retryable());
        assert!(!Error::Internal("oops".into()).is_non_retryable());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("I/O error:"));
    }
}
