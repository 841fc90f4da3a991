//! # vitae-core
//!
//! Core types, traits, and abstractions for the vitae pipeline.
//!
//! This crate provides the foundational data structures, the error
//! taxonomy, default constants, tenant-context primitives, and the
//! completion event bus that other vitae crates depend on.

pub mod defaults;
pub mod error;
pub mod events;
pub mod keywords;
pub mod logging;
pub mod models;
pub mod tenant;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{CompletionEvent, CompletionKind, EventBus};
pub use models::*;
pub use tenant::{
    extract_subdomain, is_admin_subdomain, validate_partition_key, TenantContext,
    TenantFallbackPolicy,
};
pub use uuid_utils::{is_v7, new_v7};
