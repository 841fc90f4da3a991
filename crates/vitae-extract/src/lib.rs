//! # vitae-extract
//!
//! Extraction and enhancement provider backends for the vitae pipeline.
//!
//! This crate provides:
//! - The [`ExtractionProvider`] contract with health probes and
//!   per-provider deadlines
//! - Four backends: local model (Ollama-style), remote extraction
//!   service, deterministic heuristic parser, and the minimal stub
//! - The [`ExtractionChain`] cascade, which never errors outward
//! - Normalization of heterogeneous provider output into the canonical
//!   schema
//! - The [`EnhancementStage`] scoring extracted data against a job
//!   description

pub mod chain;
pub mod enhance;
pub mod heuristic;
pub mod local_model;
pub mod normalize;
pub mod provider;
pub mod remote;
pub mod stub;

// Re-export core types
pub use vitae_core::*;

pub use chain::{ChainOutcome, ExtractionChain, ProviderAttempt};
pub use enhance::{
    EnhancementProvider, EnhancementStage, KeywordOverlapEnhancer, RemoteEnhancer,
    KEYWORD_OVERLAP_ID, REMOTE_ENHANCER_ID,
};
pub use heuristic::HeuristicProvider;
pub use local_model::{LocalModelProvider, LOCAL_MODEL_ID};
pub use normalize::{canonicalize, find_embedded_json, sanitize_email, split_skills};
pub use provider::{ExtractionInput, ExtractionProvider, ProviderFailure, RawExtraction};
pub use remote::{RemoteServiceProvider, REMOTE_SERVICE_ID};
pub use stub::{StubProvider, STUB_ID};
