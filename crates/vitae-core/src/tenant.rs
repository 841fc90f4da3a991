//! Tenant context resolution primitives.
//!
//! The pipeline never uses ambient "current tenant" state. A
//! [`TenantContext`] is constructed at unit-of-work entry, threaded
//! explicitly through every repository call, and dropped at exit, so a
//! worker picking up the next job cannot inherit the previous job's
//! data visibility.

use serde::{Deserialize, Serialize};

use crate::defaults::{ADMIN_SUBDOMAIN, SHARED_PARTITION};
use crate::{Error, Result};

/// Policy applied when no active tenant matches a resolved subdomain.
///
/// Configured explicitly (`VITAE_TENANT_FALLBACK`), never silently
/// defaulted: production rejects, development may fall back to a named
/// partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantFallbackPolicy {
    /// Fail partition resolution (production posture).
    Reject,
    /// Fall back to the named partition (development convenience).
    Default(String),
}

impl TenantFallbackPolicy {
    /// Parse the policy from its environment encoding.
    ///
    /// | Value | Policy |
    /// |-------|--------|
    /// | unset, `""`, `reject` | `Reject` |
    /// | `default:<partition>` | `Default(partition)` |
    pub fn from_env() -> Result<Self> {
        match std::env::var("VITAE_TENANT_FALLBACK") {
            Err(_) => Ok(Self::Reject),
            Ok(v) => Self::parse(&v),
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("reject") {
            return Ok(Self::Reject);
        }
        if let Some(partition) = value.strip_prefix("default:") {
            validate_partition_key(partition)?;
            return Ok(Self::Default(partition.to_string()));
        }
        Err(Error::Config(format!(
            "Invalid tenant fallback policy: '{}' (expected 'reject' or 'default:<partition>')",
            value
        )))
    }
}

/// Extract the candidate subdomain token from a request host.
///
/// Strips the port, splits on `.`, and returns the leading label when
/// the host actually carries a subdomain: three or more labels
/// (`acme.example.com`), or two labels ending in `localhost`
/// (`acme.localhost`). A bare domain has no subdomain.
pub fn extract_subdomain(host: &str) -> Option<&str> {
    let host = host.split(':').next()?;
    if host.is_empty() {
        return None;
    }
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() > 2 || (parts.len() == 2 && parts[1] == "localhost") {
        let candidate = parts[0];
        if candidate.is_empty() {
            None
        } else {
            Some(candidate)
        }
    } else {
        None
    }
}

/// Validate a partition key as a safe PostgreSQL schema identifier.
///
/// Partition keys are interpolated into schema-qualified table names,
/// so they must be structurally valid identifiers: non-empty, at most
/// 63 characters, alphanumeric/underscore, not starting with a digit,
/// and not a reserved keyword.
pub fn validate_partition_key(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Partition key cannot be empty".to_string(),
        ));
    }

    if name.len() > 63 {
        return Err(Error::InvalidInput(format!(
            "Partition key exceeds 63 character limit: {} characters",
            name.len()
        )));
    }

    if let Some(first) = name.chars().next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::InvalidInput(format!(
                "Partition key must start with a letter or underscore, found: '{}'",
                first
            )));
        }
    }

    for ch in name.chars() {
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(Error::InvalidInput(format!(
                "Partition key contains invalid character: '{}'",
                ch
            )));
        }
    }

    // "public" is intentionally allowed — it is the shared partition.
    let lowercase = name.to_lowercase();
    const RESERVED: &[&str] = &[
        "pg_catalog",
        "information_schema",
        "pg_toast",
        "select",
        "insert",
        "update",
        "delete",
        "drop",
        "create",
        "alter",
        "grant",
        "revoke",
        "truncate",
    ];
    if RESERVED.contains(&lowercase.as_str()) {
        return Err(Error::InvalidInput(format!(
            "Partition key '{}' is a reserved SQL keyword",
            name
        )));
    }

    Ok(())
}

/// The active data partition for one unit of work.
///
/// Construction validates the partition key, so holding a
/// `TenantContext` is proof the identifier is safe to qualify table
/// names with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    partition: String,
}

impl TenantContext {
    /// Build a context for the given tenant partition.
    pub fn new(partition: impl Into<String>) -> Result<Self> {
        let partition = partition.into();
        validate_partition_key(&partition)?;
        Ok(Self { partition })
    }

    /// The shared/administrative partition. Used only for cross-tenant
    /// administrative reads, never for resume processing.
    pub fn shared() -> Self {
        Self {
            partition: SHARED_PARTITION.to_string(),
        }
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn is_shared(&self) -> bool {
        self.partition == SHARED_PARTITION
    }

    /// Schema-qualify a table name for this partition.
    pub fn table(&self, name: &str) -> String {
        format!("\"{}\".{}", self.partition, name)
    }
}

/// True when the subdomain token is the reserved administrative token
/// that maps to the shared partition.
pub fn is_admin_subdomain(subdomain: &str) -> bool {
    subdomain == ADMIN_SUBDOMAIN
}
